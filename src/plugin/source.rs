use std::path::PathBuf;

use crate::models::Language;

use super::manifest::{java_package, plugin_class_name, PluginManifest};

const PLUGIN_TEMPLATE: &str = include_str!("templates/Plugin.java.tmpl");
const RULES_DEFINITION_TEMPLATE: &str = include_str!("templates/RulesDefinition.java.tmpl");

/// One generated Java source file, relative to the staging `src/` directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StubSource {
    pub path: PathBuf,
    pub content: String,
}

/// Names shared between the stub sources, the manifest and the resource layout.
#[derive(Debug, Clone)]
pub struct StubNames {
    pub java_package: String,
    pub plugin_class: String,
    pub rules_resource: String,
}

impl StubNames {
    pub fn new(package_id: &str, key: &str) -> Self {
        Self {
            java_package: java_package(key),
            plugin_class: plugin_class_name(package_id),
            rules_resource: format!("/{}/rules.xml", key),
        }
    }

    /// Fully-qualified entry point recorded in the manifest.
    pub fn qualified_plugin_class(&self) -> String {
        format!("{}.{}", self.java_package, self.plugin_class)
    }
}

/// Replace each `[TOKEN]` in `template`. Tokens without a value are left as is.
pub fn render(template: &str, tokens: &[(&str, &str)]) -> String {
    tokens.iter().fold(template.to_string(), |text, (token, value)| {
        text.replace(&format!("[{}]", token), value)
    })
}

pub fn stub_sources(
    manifest: &PluginManifest,
    names: &StubNames,
    language: Language,
) -> Vec<StubSource> {
    let repository_key = format!("{}-{}", manifest.key, language.tag());
    let repository_name = manifest.name.replace('\\', "/").replace('"', "'");
    let tokens = [
        ("JAVA_PACKAGE", names.java_package.as_str()),
        ("PLUGIN_CLASS", names.plugin_class.as_str()),
        ("PLUGIN_KEY", manifest.key.as_str()),
        ("LANGUAGE", language.tag()),
        ("REPOSITORY_KEY", repository_key.as_str()),
        ("REPOSITORY_NAME", repository_name.as_str()),
        ("RULES_RESOURCE", names.rules_resource.as_str()),
    ];

    let dir: PathBuf = names.java_package.split('.').collect();
    vec![
        StubSource {
            path: dir.join(format!("{}.java", names.plugin_class)),
            content: render(PLUGIN_TEMPLATE, &tokens),
        },
        StubSource {
            path: dir.join("RulesDefinition.java"),
            content: render(RULES_DEFINITION_TEMPLATE, &tokens),
        },
    ]
}
