use std::path::PathBuf;

use thiserror::Error;

/// Invalid run configuration, detected before any work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("package id cannot be empty")]
    EmptyPackageId,

    #[error("'{0}' is not a valid package version")]
    InvalidVersion(String),

    #[error("unsupported language '{0}' (expected 'cs' or 'vb')")]
    UnsupportedLanguage(String),

    #[error("rule file '{path}' can only be applied to the root package, not to dependency '{package}'")]
    OverrideForDependency { path: PathBuf, package: String },

    #[error("unknown toolchain '{0}' (expected 'jdk' or 'bundled')")]
    UnknownToolchain(String),
}

/// A user-supplied rule-definition file that cannot be used.
#[derive(Debug, Error)]
pub enum RuleFileError {
    #[error("failed to read rule file '{path}'")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("rule file '{path}' is not valid rules XML: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("rule file '{path}' is invalid: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
