//! Archive toolchains.
//!
//! - [`jdk`] — compiles the stub sources with `javac` and packs with `jar`.
//! - [`bundled`] — zips the staged layout in-process, sources uncompiled.

pub mod bundled;
pub mod jdk;

use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde::Deserialize;

use crate::error::ConfigError;

pub use bundled::BundledToolchain;
pub use jdk::JdkToolchain;

/// Turns a staged plugin layout into an archive.
///
/// The staging directory holds `src/` (Java sources), `resources/` and the
/// manifest at `manifest`.
pub trait Toolchain {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    fn compile_archive(&self, staging: &Path, manifest: &Path, archive: &Path) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolchainKind {
    #[default]
    Jdk,
    /// Uncompiled staging archive, for offline use and tests.
    Bundled,
}

impl ToolchainKind {
    pub fn create(self) -> Box<dyn Toolchain> {
        match self {
            ToolchainKind::Jdk => Box::new(JdkToolchain::from_env()),
            ToolchainKind::Bundled => Box::new(BundledToolchain),
        }
    }
}

impl FromStr for ToolchainKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jdk" => Ok(ToolchainKind::Jdk),
            "bundled" => Ok(ToolchainKind::Bundled),
            other => Err(ConfigError::UnknownToolchain(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("JDK".parse::<ToolchainKind>().unwrap(), ToolchainKind::Jdk);
        assert_eq!("bundled".parse::<ToolchainKind>().unwrap(), ToolchainKind::Bundled);
        assert!("maven".parse::<ToolchainKind>().is_err());
        assert_eq!(ToolchainKind::Bundled.create().name(), "bundled");
    }

    #[test]
    fn test_jdk_is_the_default() {
        assert_eq!(ToolchainKind::default(), ToolchainKind::Jdk);
        assert_eq!(ToolchainKind::default().create().name(), "jdk");
    }
}
