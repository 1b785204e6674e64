//! MCD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, McdError>;

/// Top-level error type for Maven Cache Doctor.
#[derive(Debug, Error)]
pub enum McdError {
    #[error("[MCD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[MCD-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[MCD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[MCD-2001] no usable local repository path ({attempts} strategies tried): {details}")]
    Resolution { attempts: usize, details: String },

    #[error("[MCD-2002] scan root {path} is not usable: {details}")]
    ScanRoot { path: PathBuf, details: String },

    #[error("[MCD-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[MCD-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[MCD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl McdError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "MCD-1001",
            Self::MissingConfig { .. } => "MCD-1002",
            Self::ConfigParse { .. } => "MCD-1003",
            Self::Resolution { .. } => "MCD-2001",
            Self::ScanRoot { .. } => "MCD-2002",
            Self::Serialization { .. } => "MCD-2101",
            Self::Io { .. } => "MCD-3002",
            Self::Runtime { .. } => "MCD-3900",
        }
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for an unusable scan root.
    #[must_use]
    pub fn scan_root(path: impl AsRef<Path>, details: impl Into<String>) -> Self {
        Self::ScanRoot {
            path: path.as_ref().to_path_buf(),
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for McdError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for McdError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<toml::ser::Error> for McdError {
    fn from(value: toml::ser::Error) -> Self {
        Self::Serialization {
            context: "toml",
            details: value.to_string(),
        }
    }
}
