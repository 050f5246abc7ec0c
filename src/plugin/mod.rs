//! Plugin artifact assembly.
//!
//! - [`manifest`] — plugin manifest fields and `MANIFEST.MF` rendering.
//! - [`rules`] — rules XML: template generation, loading and validation.
//! - [`source`] — Java stub sources rendered from embedded templates.

pub mod manifest;
pub mod rules;
pub mod source;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::error::ConfigError;
use crate::graph::PackageNode;
use crate::log::{LogSink, MessageCode};
use crate::models::{Language, PluginArtifact, RuleDefinitionSource};
use crate::toolchain::Toolchain;

use manifest::PluginManifest;
use rules::Rules;
use source::{stub_sources, StubNames};

/// A validated user-supplied rules file.
#[derive(Debug, Clone)]
pub struct RuleOverride {
    pub path: PathBuf,
    pub rules: Rules,
}

/// One node to assemble, with the rules override when it applies.
#[derive(Debug)]
pub struct ArtifactRequest<'a> {
    node: &'a PackageNode,
    rule_override: Option<&'a RuleOverride>,
}

impl<'a> ArtifactRequest<'a> {
    /// A rules override can only be paired with the root package.
    pub fn new(
        node: &'a PackageNode,
        is_root: bool,
        rule_override: Option<&'a RuleOverride>,
    ) -> Result<Self, ConfigError> {
        if let (Some(ov), false) = (rule_override, is_root) {
            return Err(ConfigError::OverrideForDependency {
                path: ov.path.clone(),
                package: node.id().to_string(),
            });
        }
        Ok(Self {
            node,
            rule_override,
        })
    }
}

pub struct ArtifactAssembler<'a> {
    toolchain: &'a dyn Toolchain,
    output_dir: &'a Path,
    language: Language,
    log: &'a dyn LogSink,
}

impl<'a> ArtifactAssembler<'a> {
    pub fn new(
        toolchain: &'a dyn Toolchain,
        output_dir: &'a Path,
        language: Language,
        log: &'a dyn LogSink,
    ) -> Self {
        Self {
            toolchain,
            output_dir,
            language,
            log,
        }
    }

    /// Archive path for a package: `<output>/<id>.<version>.jar`.
    pub fn archive_path(&self, node: &PackageNode) -> PathBuf {
        self.output_dir.join(format!("{}.{}.jar", node.id(), node.version()))
    }

    /// Rule template path for a package: `<output>/<id>.<version>.rules.template.xml`.
    pub fn template_path(&self, node: &PackageNode) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}.rules.template.xml", node.id(), node.version()))
    }

    pub fn assemble(&self, request: &ArtifactRequest<'_>) -> Result<PluginArtifact> {
        let node = request.node;
        fs::create_dir_all(self.output_dir)
            .with_context(|| format!("cannot create {}", self.output_dir.display()))?;

        let manifest = PluginManifest::from_metadata(node.metadata())?;
        let names = StubNames::new(node.id(), &manifest.key);

        let (rules, rule_source, template_path) = match request.rule_override {
            Some(ov) => (ov.rules.clone(), RuleDefinitionSource::UserSupplied, None),
            None => {
                let template = Rules::from_analyzers(&node.inventory.analyzers);
                let path = self.template_path(node);
                fs::write(&path, template.to_xml()?)
                    .with_context(|| format!("cannot write {}", path.display()))?;
                self.log.info(
                    MessageCode::RuleTemplateGenerated,
                    &format!("Rule template for {} written to {}", node.id(), path.display()),
                );
                (template, RuleDefinitionSource::AutoGeneratedTemplate, Some(path))
            }
        };

        let staging = TempDir::new().context("cannot create staging directory")?;
        let manifest_path = self.stage(staging.path(), node, &manifest, &names, &rules)?;

        let archive_path = self.archive_path(node);
        self.toolchain
            .compile_archive(staging.path(), &manifest_path, &archive_path)
            .with_context(|| format!("{} failed to build {}", self.toolchain.name(), archive_path.display()))?;
        self.log.info(
            MessageCode::PluginGenerated,
            &format!("Plugin for {} generated: {}", node.id(), archive_path.display()),
        );

        Ok(PluginArtifact {
            package_id: node.id().to_string(),
            package_version: node.version().clone(),
            plugin_key: manifest.key,
            rule_source,
            archive_path,
            rule_template_path: template_path,
        })
    }

    /// Lay out sources, resources and the manifest; returns the manifest path.
    fn stage(
        &self,
        staging: &Path,
        node: &PackageNode,
        manifest: &PluginManifest,
        names: &StubNames,
        rules: &Rules,
    ) -> Result<PathBuf> {
        let src = staging.join("src");
        for stub in stub_sources(manifest, names, self.language) {
            write(&src.join(&stub.path), stub.content.as_bytes())?;
        }

        let resources = staging.join("resources").join(&manifest.key);
        write(&resources.join("rules.xml"), rules.to_xml()?.as_bytes())?;

        let static_dir = resources.join("static");
        fs::create_dir_all(&static_dir)?;
        for payload in node.package.assembly_paths() {
            let Some(file_name) = payload.file_name() else {
                continue;
            };
            fs::copy(&payload, static_dir.join(file_name))
                .with_context(|| format!("cannot copy {}", payload.display()))?;
        }

        let manifest_path = staging.join("META-INF").join("MANIFEST.MF");
        write(
            &manifest_path,
            manifest.to_manifest_mf(&names.qualified_plugin_class()).as_bytes(),
        )?;
        Ok(manifest_path)
    }
}

fn write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PackageGraph;
    use crate::log::MemorySink;
    use crate::testing::{resolve_graph, Fixture, License, RecordingToolchain};
    use crate::toolchain::BundledToolchain;
    use std::fs::File;
    use zip::ZipArchive;

    fn root_graph(fx: &Fixture) -> PackageGraph {
        fx.package("Foo.Analyzers", "1.2.0", License::NotRequired, true, &[]);
        resolve_graph(fx, "Foo.Analyzers", false)
    }

    #[test]
    fn test_template_generated_without_override() {
        let fx = Fixture::new();
        let graph = root_graph(&fx);
        let out = TempDir::new().unwrap();
        let log = MemorySink::new();
        let assembler = ArtifactAssembler::new(&BundledToolchain, out.path(), Language::CSharp, &log);

        let node = graph.node(graph.root());
        let artifact = assembler.assemble(&ArtifactRequest::new(node, true, None).unwrap()).unwrap();

        assert_eq!(artifact.rule_source, RuleDefinitionSource::AutoGeneratedTemplate);
        assert_eq!(artifact.archive_path, out.path().join("Foo.Analyzers.1.2.0.jar"));
        let template = out.path().join("Foo.Analyzers.1.2.0.rules.template.xml");
        assert_eq!(artifact.rule_template_path.as_deref(), Some(template.as_path()));
        assert!(template.exists());

        let logged = log.with_code(MessageCode::RuleTemplateGenerated);
        assert_eq!(logged.len(), 1);
        assert!(logged[0].message.contains(&template.display().to_string()));
        assert_eq!(log.with_code(MessageCode::PluginGenerated).len(), 1);

        let zip = ZipArchive::new(File::open(&artifact.archive_path).unwrap()).unwrap();
        let names: Vec<&str> = zip.file_names().collect();
        assert!(names.contains(&"fooanalyzers/rules.xml"));
        assert!(names.contains(&"fooanalyzers/static/Foo.Analyzers.dll"));
    }

    #[test]
    fn test_override_is_bundled_and_no_template_written() {
        let fx = Fixture::new();
        let graph = root_graph(&fx);
        let out = TempDir::new().unwrap();
        let log = MemorySink::new();
        let toolchain = RecordingToolchain::new();
        let assembler = ArtifactAssembler::new(&toolchain, out.path(), Language::CSharp, &log);
        let ov = RuleOverride {
            path: PathBuf::from("custom.xml"),
            rules: Rules::default(),
        };

        let node = graph.node(graph.root());
        let artifact = assembler
            .assemble(&ArtifactRequest::new(node, true, Some(&ov)).unwrap())
            .unwrap();

        assert_eq!(artifact.rule_source, RuleDefinitionSource::UserSupplied);
        assert!(artifact.rule_template_path.is_none());
        assert!(log.with_code(MessageCode::RuleTemplateGenerated).is_empty());
        let staged = toolchain.staged_rules();
        assert_eq!(staged.len(), 1);
        assert!(staged[0].contains("<rules"));
        assert!(!staged[0].contains("<rule>"));
    }

    #[test]
    fn test_override_rejected_for_dependency() {
        let fx = Fixture::new();
        let graph = root_graph(&fx);
        let ov = RuleOverride {
            path: PathBuf::from("custom.xml"),
            rules: Rules::default(),
        };
        let err = ArtifactRequest::new(graph.node(graph.root()), false, Some(&ov)).unwrap_err();
        assert!(matches!(err, ConfigError::OverrideForDependency { .. }));
    }

    #[test]
    fn test_toolchain_failure_is_an_error() {
        let fx = Fixture::new();
        let graph = root_graph(&fx);
        let out = TempDir::new().unwrap();
        let log = MemorySink::new();
        let toolchain = RecordingToolchain::failing();
        let assembler = ArtifactAssembler::new(&toolchain, out.path(), Language::CSharp, &log);

        let node = graph.node(graph.root());
        let err = assembler
            .assemble(&ArtifactRequest::new(node, true, None).unwrap())
            .unwrap_err();

        assert!(format!("{:#}", err).contains("Foo.Analyzers.1.2.0.jar"));
        assert!(log.with_code(MessageCode::PluginGenerated).is_empty());
    }

    #[test]
    fn test_manifest_is_byte_identical_across_runs() {
        let fx = Fixture::new();
        let graph = root_graph(&fx);
        let out = TempDir::new().unwrap();
        let log = MemorySink::new();
        let toolchain = RecordingToolchain::new();
        let assembler = ArtifactAssembler::new(&toolchain, out.path(), Language::CSharp, &log);
        let node = graph.node(graph.root());

        for _ in 0..2 {
            assembler.assemble(&ArtifactRequest::new(node, true, None).unwrap()).unwrap();
        }

        let manifests = toolchain.staged_manifests();
        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0], manifests[1]);
        assert!(manifests[0].contains("Plugin-Key: fooanalyzers"));
    }
}
