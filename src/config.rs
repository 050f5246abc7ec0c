use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::models::{Language, PackageVersion};
use crate::repository::remote::NUGET_ORG;
use crate::toolchain::ToolchainKind;

/// Tool configuration, deserialized from `.analyzer-plugin-gen/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

/// Where packages come from.
#[derive(Debug, Default, Deserialize)]
pub struct RepositoryConfig {
    /// Flat-container URL or local feed directory. Defaults to nuget.org.
    pub feed: Option<String>,
    /// Download and extraction cache. Defaults to the user cache directory.
    pub cache_dir: Option<PathBuf>,
}

impl RepositoryConfig {
    pub fn feed(&self) -> &str {
        self.feed.as_deref().unwrap_or(NUGET_ORG)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("analyzer-plugin-gen")
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolchainConfig {
    #[serde(default)]
    pub kind: ToolchainKind,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerationConfig {
    /// `cs` or `vb`.
    pub language: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// Load the tool configuration, searching in order:
///
/// 1. `config_override` — path passed via `--config`
/// 2. `<project_path>/.analyzer-plugin-gen/config.toml`
/// 3. `~/.config/analyzer-plugin-gen/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        let content = std::fs::read_to_string(path)?;
        return Ok(toml::from_str(&content)?);
    }

    let project_config = project_path.join(".analyzer-plugin-gen").join("config.toml");
    if project_config.exists() {
        let content = std::fs::read_to_string(&project_config)?;
        return Ok(toml::from_str(&content)?);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home
            .join(".config")
            .join("analyzer-plugin-gen")
            .join("config.toml");
        if home_config.exists() {
            let content = std::fs::read_to_string(&home_config)?;
            return Ok(toml::from_str(&content)?);
        }
    }

    Ok(Config::default())
}

/// Inputs of one generation run, validated at construction.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub package_id: String,
    /// `None` selects the latest published version.
    pub version: Option<PackageVersion>,
    pub language: Language,
    pub accept_licenses: bool,
    pub recurse: bool,
    pub output_dir: PathBuf,
    /// Rules file for the root package.
    pub rule_file: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(
        package_id: &str,
        version: Option<&str>,
        language: Language,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let package_id = package_id.trim();
        if package_id.is_empty() {
            return Err(ConfigError::EmptyPackageId);
        }
        let version = version
            .filter(|v| !v.trim().is_empty())
            .map(PackageVersion::parse)
            .transpose()?;

        Ok(Self {
            package_id: package_id.to_string(),
            version,
            language,
            accept_licenses: false,
            recurse: false,
            output_dir: output_dir.into(),
            rule_file: None,
        })
    }

    pub fn accept_licenses(mut self, accept: bool) -> Self {
        self.accept_licenses = accept;
        self
    }

    pub fn recurse(mut self, recurse: bool) -> Self {
        self.recurse = recurse;
        self
    }

    pub fn rule_file(mut self, path: Option<PathBuf>) -> Self {
        self.rule_file = path;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.repository.feed(), NUGET_ORG);
        assert_eq!(cfg.toolchain.kind, ToolchainKind::Jdk);
        assert!(cfg.generation.language.is_none());
    }

    #[test]
    fn test_load_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[repository]
feed = "/srv/feed"
cache_dir = "/tmp/apg-cache"

[toolchain]
kind = "jdk"

[generation]
language = "vb"
output_dir = "out"
"#
        )
        .unwrap();

        let cfg = load_config(Path::new("."), Some(file.path())).unwrap();
        assert_eq!(cfg.repository.feed(), "/srv/feed");
        assert_eq!(cfg.repository.cache_dir(), PathBuf::from("/tmp/apg-cache"));
        assert_eq!(cfg.toolchain.kind, ToolchainKind::Jdk);
        assert_eq!(cfg.generation.language.as_deref(), Some("vb"));
        assert_eq!(cfg.generation.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_project_config_is_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let cfg_dir = dir.path().join(".analyzer-plugin-gen");
        std::fs::create_dir_all(&cfg_dir).unwrap();
        std::fs::write(cfg_dir.join("config.toml"), "[toolchain]\nkind = \"jdk\"\n").unwrap();

        let cfg = load_config(dir.path(), None).unwrap();
        assert_eq!(cfg.toolchain.kind, ToolchainKind::Jdk);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[toolchain]\nkind = \"gradle\"").unwrap();
        assert!(load_config(Path::new("."), Some(file.path())).is_err());
    }

    #[test]
    fn test_run_config_validation() {
        assert!(matches!(
            RunConfig::new("  ", None, Language::CSharp, "out"),
            Err(ConfigError::EmptyPackageId)
        ));
        assert!(matches!(
            RunConfig::new("Foo", Some("one.two"), Language::CSharp, "out"),
            Err(ConfigError::InvalidVersion(_))
        ));

        let cfg = RunConfig::new(" Foo ", Some("1.0"), Language::CSharp, "out")
            .unwrap()
            .recurse(true);
        assert_eq!(cfg.package_id, "Foo");
        assert_eq!(cfg.version.unwrap().as_str(), "1.0");
        assert!(cfg.recurse);
        assert!(!cfg.accept_licenses);
    }
}
