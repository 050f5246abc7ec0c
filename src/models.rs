use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::str::FromStr;

use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ConfigError;

/// Target language of the generated plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "cs")]
    CSharp,
    #[serde(rename = "vb")]
    VisualBasic,
}

impl Language {
    /// Short tag used on the command line and in plugin keys.
    pub fn tag(self) -> &'static str {
        match self {
            Language::CSharp => "cs",
            Language::VisualBasic => "vb",
        }
    }

    /// Name an analyzer declares in its language marker.
    pub fn analyzer_name(self) -> &'static str {
        match self {
            Language::CSharp => "C#",
            Language::VisualBasic => "Visual Basic",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cs" => Ok(Language::CSharp),
            "vb" => Ok(Language::VisualBasic),
            other => Err(ConfigError::UnsupportedLanguage(other.to_string())),
        }
    }
}

/// A NuGet-style package version.
///
/// Keeps the text as published (`1.0`, `1.1.1-RC5`) for display and file
/// names. Ordering and equality use the normalized numeric form, so `1.0`
/// and `1.0.0` are the same version.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    text: String,
    version: Version,
    revision: u64,
}

impl PackageVersion {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let text = text.trim();
        let invalid = || ConfigError::InvalidVersion(text.to_string());

        let without_metadata = text.split('+').next().unwrap_or(text);
        let (numbers, pre) = match without_metadata.split_once('-') {
            Some((numbers, pre)) => (numbers, Some(pre)),
            None => (without_metadata, None),
        };

        let parts = numbers
            .split('.')
            .map(|p| p.parse::<u64>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        if parts.is_empty() || parts.len() > 4 {
            return Err(invalid());
        }

        let part = |i: usize| parts.get(i).copied().unwrap_or(0);
        let mut version = Version::new(part(0), part(1), part(2));
        if let Some(pre) = pre {
            version.pre = Prerelease::new(pre).map_err(|_| invalid())?;
        }

        Ok(Self {
            text: text.to_string(),
            version,
            revision: part(3),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_prerelease(&self) -> bool {
        !self.version.pre.is_empty()
    }

    fn sort_key(&self) -> (u64, u64, u64, u64, &Prerelease) {
        (
            self.version.major,
            self.version.minor,
            self.version.patch,
            self.revision,
            &self.version.pre,
        )
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let (major, minor, patch, revision, pre) = self.sort_key();
        (major, minor, patch, revision, pre.as_str()).hash(state);
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for PackageVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Identity of a resolved package within one run: id (case-insensitive) plus version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    id: String,
    version: PackageVersion,
}

impl NodeKey {
    pub fn new(id: &str, version: &PackageVersion) -> Self {
        Self {
            id: id.to_ascii_lowercase(),
            version: version.clone(),
        }
    }
}

/// A dependency as declared by a package: the id and the lowest acceptable version.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyRef {
    pub id: String,
    pub version: Option<PackageVersion>,
}

/// Package metadata as reported by the repository.
#[derive(Debug, Clone, Serialize)]
pub struct PackageMetadata {
    pub id: String,
    pub version: PackageVersion,
    pub title: Option<String>,
    pub authors: String,
    pub owners: Option<String>,
    pub description: String,
    pub project_url: Option<String>,
    pub license_url: Option<String>,
    pub license_names: Option<String>,
    pub require_license_acceptance: bool,
    #[serde(skip)]
    pub dependencies: Vec<DependencyRef>,
}

impl PackageMetadata {
    /// License text shown to the user: the short name when known, else the URL.
    pub fn license_display(&self) -> Option<&str> {
        self.license_names
            .as_deref()
            .or(self.license_url.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

/// Severity an analyzer declares for one of its diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Hidden,
    Info,
    #[default]
    Warning,
    Error,
}

/// One diagnostic an analyzer can report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticDescriptor {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub severity: DiagnosticSeverity,
    #[serde(default = "default_enabled")]
    pub enabled_by_default: bool,
    #[serde(default)]
    pub help_link: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// A live analyzer discovered in a payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzerDescriptor {
    pub type_name: String,
    pub assembly: String,
    /// Payload file the type was loaded from.
    pub payload: PathBuf,
    pub languages: Vec<String>,
    pub diagnostics: Vec<DiagnosticDescriptor>,
}

/// Where the rule definitions bundled into an artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleDefinitionSource {
    UserSupplied,
    AutoGeneratedTemplate,
}

impl fmt::Display for RuleDefinitionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleDefinitionSource::UserSupplied => write!(f, "user supplied"),
            RuleDefinitionSource::AutoGeneratedTemplate => write!(f, "template"),
        }
    }
}

/// One generated plugin archive.
#[derive(Debug, Clone, Serialize)]
pub struct PluginArtifact {
    pub package_id: String,
    pub package_version: PackageVersion,
    pub plugin_key: String,
    pub rule_source: RuleDefinitionSource,
    pub archive_path: PathBuf,
    pub rule_template_path: Option<PathBuf>,
}
