use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::models::{AnalyzerDescriptor, DiagnosticDescriptor};

/// Entry points a type must expose to be usable as an analyzer.
pub const ANALYZER_ENTRY_POINTS: [&str; 2] = ["initialize", "supported_diagnostics"];

/// The exported-type table of one payload assembly.
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentTable {
    pub assembly: String,
    #[serde(default)]
    pub types: Vec<ComponentType>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Internal,
}

/// How a type can be constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constructor {
    /// Public parameterless constructor.
    #[default]
    Default,
    /// Only constructors that take arguments.
    Parameterized,
    /// Parameterless constructor that fails when run.
    Faulting,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentType {
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub entry_points: Vec<String>,
    /// Languages named by the type's analyzer marker; `None` when unmarked.
    #[serde(default)]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub constructor: Constructor,
    #[serde(default)]
    pub diagnostics: Vec<DiagnosticDescriptor>,
}

impl ComponentType {
    pub fn implements_analyzer_contract(&self) -> bool {
        ANALYZER_ENTRY_POINTS
            .iter()
            .all(|required| self.entry_points.iter().any(|e| e == required))
    }
}

/// Loads a payload file into its component table.
pub trait PayloadLoader {
    fn load(&self, path: &Path) -> Result<ComponentTable>;
}

/// Reads component tables stored as TOML documents.
pub struct ComponentTableLoader;

impl PayloadLoader for ComponentTableLoader {
    fn load(&self, path: &Path) -> Result<ComponentTable> {
        let bytes = std::fs::read(path).with_context(|| format!("cannot read {}", path.display()))?;
        let text = String::from_utf8(bytes)
            .with_context(|| format!("{} has no readable component table", path.display()))?;
        let table: ComponentTable = toml::from_str(&text)
            .with_context(|| format!("{} has an invalid component table", path.display()))?;
        Ok(table)
    }
}

/// Turns a qualifying component type from `payload` into a live analyzer.
pub trait AnalyzerFactory {
    fn instantiate(
        &self,
        payload: &Path,
        assembly: &str,
        component: &ComponentType,
    ) -> Result<AnalyzerDescriptor>;
}

/// Instantiates types through their parameterless constructor.
pub struct DefaultConstructorFactory;

impl AnalyzerFactory for DefaultConstructorFactory {
    fn instantiate(
        &self,
        payload: &Path,
        assembly: &str,
        component: &ComponentType,
    ) -> Result<AnalyzerDescriptor> {
        match component.constructor {
            Constructor::Default => {}
            Constructor::Parameterized => {
                bail!("{} has no parameterless constructor", component.name)
            }
            Constructor::Faulting => bail!("constructor of {} failed", component.name),
        }
        if let Some(bad) = component.diagnostics.iter().find(|d| d.id.trim().is_empty()) {
            bail!(
                "{} declares a diagnostic without an id (title '{}')",
                component.name,
                bad.title
            );
        }

        Ok(AnalyzerDescriptor {
            type_name: component.name.clone(),
            assembly: assembly.to_string(),
            payload: payload.to_path_buf(),
            languages: component.languages.clone().unwrap_or_default(),
            diagnostics: component.diagnostics.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(toml_text: &str) -> ComponentType {
        let table: ComponentTable = toml::from_str(toml_text).unwrap();
        table.types.into_iter().next().unwrap()
    }

    #[test]
    fn test_defaults() {
        let t = component(
            r#"assembly = "A"
[[types]]
name = "A.Analyzer"
"#,
        );
        assert_eq!(t.visibility, Visibility::Public);
        assert!(!t.is_abstract);
        assert_eq!(t.constructor, Constructor::Default);
        assert!(t.languages.is_none());
        assert!(!t.implements_analyzer_contract());
    }

    #[test]
    fn test_factory_rejects_parameterized_constructor() {
        let t = component(
            r#"assembly = "A"
[[types]]
name = "A.NeedsArgs"
constructor = "parameterized"
"#,
        );
        let err = DefaultConstructorFactory.instantiate(Path::new("A.dll"), "A", &t).unwrap_err();
        assert!(err.to_string().contains("parameterless"));
    }

    #[test]
    fn test_factory_builds_descriptor() {
        let t = component(
            r#"assembly = "A"
[[types]]
name = "A.Good"
entry_points = ["initialize", "supported_diagnostics"]
languages = ["C#"]
[[types.diagnostics]]
id = "A001"
title = "Avoid things"
severity = "error"
"#,
        );
        let analyzer = DefaultConstructorFactory.instantiate(Path::new("A.dll"), "A", &t).unwrap();
        assert_eq!(analyzer.type_name, "A.Good");
        assert_eq!(analyzer.payload, Path::new("A.dll"));
        assert_eq!(analyzer.languages, vec!["C#".to_string()]);
        assert_eq!(analyzer.diagnostics[0].id, "A001");
        assert!(analyzer.diagnostics[0].enabled_by_default);
    }
}
