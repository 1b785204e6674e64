//! Artifact identities and corruption verdicts shared by the scanner and cleanup.

#![allow(missing_docs)]

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, Serializer};

/// A directory inside the repository plus a file name stripped of its
/// archive/descriptor extension (`lib-1.0` for `lib-1.0.jar`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub folder: PathBuf,
    pub base_name: String,
}

impl ArtifactLocation {
    pub fn new(folder: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            base_name: base_name.into(),
        }
    }

    /// `folder/base_name.ext`.
    pub fn file_with_extension(&self, ext: &str) -> PathBuf {
        self.folder.join(format!("{}.{ext}", self.base_name))
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.folder.join(&self.base_name).display())
    }
}

/// Why a file was flagged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CorruptionReason {
    /// Zero-length archive file.
    EmptyArchive,
    /// Central directory or a local header failed to parse (truncation included).
    InvalidArchiveStructure,
    /// Parses as a container but relies on something the reader rejects.
    UnsupportedArchiveFeature,
    /// Descriptor contains an error-page marker; holds the marker's category.
    ProxyErrorPage(String),
}

impl fmt::Display for CorruptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyArchive => f.write_str("empty archive"),
            Self::InvalidArchiveStructure => f.write_str("invalid archive structure"),
            Self::UnsupportedArchiveFeature => f.write_str("unsupported archive feature"),
            Self::ProxyErrorPage(category) => write!(f, "contains proxy error page: {category}"),
        }
    }
}

impl Serialize for CorruptionReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of validating one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(CorruptionReason),
}

impl Verdict {
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A flagged artifact as reported by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct InvalidArtifact {
    pub folder: PathBuf,
    pub base_name: String,
    pub reason: CorruptionReason,
}

impl InvalidArtifact {
    pub fn location(&self) -> ArtifactLocation {
        ArtifactLocation::new(self.folder.clone(), self.base_name.clone())
    }
}

impl From<&InvalidArtifact> for ArtifactLocation {
    fn from(artifact: &InvalidArtifact) -> Self {
        artifact.location()
    }
}

/// Split `path` into `(folder, base_name)` by removing `ext` from the file name.
///
/// Returns `None` when the file name does not end in `.ext` or would leave an
/// empty base name.
pub fn split_artifact_path(path: &Path, ext: &str) -> Option<(PathBuf, String)> {
    let name = path.file_name()?.to_str()?;
    let base = name.strip_suffix(ext)?.strip_suffix('.')?;
    if base.is_empty() {
        return None;
    }
    Some((path.parent()?.to_path_buf(), base.to_string()))
}
