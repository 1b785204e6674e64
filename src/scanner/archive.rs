//! Structural validation of zip-format archives (`.jar` and friends).
//!
//! Parses the central directory and every entry's local header. Entry
//! payloads are never decompressed, so stored, deflate, bzip2 and zstd
//! entries cost the same to check.

use std::fs::File;
use std::io::{self, ErrorKind};
use std::path::Path;

use zip::ZipArchive;
use zip::result::ZipError;

use crate::scanner::artifact::{CorruptionReason, Verdict};

/// Stateless archive validator; one instance is shared by all scan workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveValidator;

impl ArchiveValidator {
    /// Validate the archive at `path`.
    ///
    /// `Err` means the file could not be opened or read for a reason other
    /// than truncation. The file handle is closed before returning.
    pub fn validate(&self, path: &Path) -> io::Result<Verdict> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Verdict::Invalid(CorruptionReason::EmptyArchive));
        }

        let mut archive = match ZipArchive::new(file) {
            Ok(archive) => archive,
            Err(err) => return classify(err),
        };

        for index in 0..archive.len() {
            if let Err(err) = archive.by_index_raw(index) {
                return classify(err);
            }
        }
        Ok(Verdict::Valid)
    }
}

fn classify(err: ZipError) -> io::Result<Verdict> {
    match err {
        ZipError::Io(io_err) if io_err.kind() == ErrorKind::UnexpectedEof => {
            Ok(Verdict::Invalid(CorruptionReason::InvalidArchiveStructure))
        }
        ZipError::Io(io_err) => Err(io_err),
        ZipError::UnsupportedArchive(_) => {
            Ok(Verdict::Invalid(CorruptionReason::UnsupportedArchiveFeature))
        }
        _ => Ok(Verdict::Invalid(CorruptionReason::InvalidArchiveStructure)),
    }
}
