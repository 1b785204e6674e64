//! Cleanup executor: two-phase removal of flagged artifacts.
//!
//! Per item:
//! 1. Validate the location (safe base name, folder inside the root).
//! 2. Primary phase: delete every `<base_name>.<ext>` for the archive and
//!    descriptor extensions. Nothing to delete, or a failed delete, fails
//!    the item.
//! 3. Companion phase: best-effort removal of checksums, signatures,
//!    `.lastUpdated` markers, classifier files and repository bookkeeping.
//!
//! Items run sequentially in input order and a failure never stops the batch.

#![allow(missing_docs)]

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::config::{CleanupConfig, ScannerConfig};
use crate::core::paths::is_within;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::scanner::artifact::ArtifactLocation;

// ──────────────────── configuration ────────────────────

/// What the executor deletes and where it may delete it.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub archive_extensions: Vec<String>,
    pub descriptor_extensions: Vec<String>,
    /// Per-folder bookkeeping files removed in the companion phase.
    pub bookkeeping_files: Vec<String>,
    /// When set, folders outside this root are refused.
    pub root: Option<PathBuf>,
}

impl CleanupOptions {
    /// Options from config. `root` is kept only when `confine_to_root` is on.
    pub fn from_config(
        scanner: &ScannerConfig,
        cleanup: &CleanupConfig,
        root: Option<PathBuf>,
    ) -> Self {
        Self {
            archive_extensions: scanner.archive_extensions.clone(),
            descriptor_extensions: scanner.descriptor_extensions.clone(),
            bookkeeping_files: cleanup.bookkeeping_files.clone(),
            root: root.filter(|_| cleanup.confine_to_root),
        }
    }
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::from_config(&ScannerConfig::default(), &CleanupConfig::default(), None)
    }
}

// ──────────────────── report types ────────────────────

/// Boundary result: how many items were deleted and one message per failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanResult {
    pub deleted_count: usize,
    pub errors: Vec<String>,
}

/// A single item that could not be cleaned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionError {
    pub location: ArtifactLocation,
    pub error_code: &'static str,
    pub error: String,
}

impl fmt::Display for DeletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.error_code, self.location, self.error)
    }
}

/// Full outcome of a cleanup batch.
#[derive(Debug, Clone, Default)]
pub struct CleanupReport {
    pub deleted: Vec<ArtifactLocation>,
    pub failures: Vec<DeletionError>,
    pub companions_removed: usize,
    pub duplicates_skipped: usize,
    pub duration: Duration,
}

impl CleanupReport {
    pub fn result(&self) -> CleanResult {
        CleanResult {
            deleted_count: self.deleted.len(),
            errors: self.failures.iter().map(ToString::to_string).collect(),
        }
    }
}

const INVALID_ITEM: &str = "MCD-3101";
const OUTSIDE_ROOT: &str = "MCD-3102";
const ALREADY_GONE: &str = "MCD-3103";
const DELETE_FAILED: &str = "MCD-3104";

// ──────────────────── executor ────────────────────

pub struct CleanupExecutor {
    options: CleanupOptions,
    logger: Option<ActivityLoggerHandle>,
}

impl CleanupExecutor {
    pub fn new(options: CleanupOptions, logger: Option<ActivityLoggerHandle>) -> Self {
        Self { options, logger }
    }

    pub fn clean(&self, items: &[ArtifactLocation]) -> CleanResult {
        self.clean_with_report(items).result()
    }

    /// Clean every item. Repeated `(folder, base_name)` pairs are processed
    /// once; later copies are counted in `duplicates_skipped` only.
    pub fn clean_with_report(&self, items: &[ArtifactLocation]) -> CleanupReport {
        let start = Instant::now();
        let mut report = CleanupReport::default();
        let mut seen: HashSet<&ArtifactLocation> = HashSet::with_capacity(items.len());

        for item in items {
            if !seen.insert(item) {
                report.duplicates_skipped += 1;
                continue;
            }
            match self.clean_one(item) {
                Ok(companions) => {
                    report.companions_removed += companions;
                    self.log_event(ActivityEvent::ArtifactDeleted {
                        folder: item.folder.display().to_string(),
                        base_name: item.base_name.clone(),
                        companions_removed: companions as u64,
                    });
                    report.deleted.push(item.clone());
                }
                Err(error) => {
                    self.log_event(ActivityEvent::ArtifactDeletionFailed {
                        folder: item.folder.display().to_string(),
                        base_name: item.base_name.clone(),
                        error_code: error.error_code.to_string(),
                        error_message: error.error.clone(),
                    });
                    report.failures.push(error);
                }
            }
        }

        report.duration = start.elapsed();
        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = report.duration.as_millis() as u64;
        self.log_event(ActivityEvent::CleanCompleted {
            deleted: report.deleted.len() as u64,
            failed: report.failures.len() as u64,
            duplicates_skipped: report.duplicates_skipped as u64,
            duration_ms,
        });
        report
    }

    /// Returns the number of companion files removed.
    fn clean_one(&self, item: &ArtifactLocation) -> Result<usize, DeletionError> {
        self.preflight(item)?;
        self.delete_primaries(item)?;
        Ok(self.delete_companions(item))
    }

    // ──────────────────── pre-flight checks ────────────────────

    fn preflight(&self, item: &ArtifactLocation) -> Result<(), DeletionError> {
        let name = item.base_name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(failure(
                item,
                INVALID_ITEM,
                format!("invalid base name {name:?}"),
            ));
        }
        if let Some(root) = &self.options.root {
            if !is_within(&item.folder, root) {
                return Err(failure(
                    item,
                    OUTSIDE_ROOT,
                    format!("path escapes root {}", root.display()),
                ));
            }
        }
        Ok(())
    }

    // ──────────────────── deletion ────────────────────

    fn delete_primaries(&self, item: &ArtifactLocation) -> Result<(), DeletionError> {
        let mut removed = 0usize;
        for ext in self
            .options
            .archive_extensions
            .iter()
            .chain(&self.options.descriptor_extensions)
        {
            let path = item.file_with_extension(ext);
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(failure(
                        item,
                        DELETE_FAILED,
                        format!("failed to delete {}: {e}", path.display()),
                    ));
                }
            }
        }
        if removed == 0 {
            return Err(failure(item, ALREADY_GONE, "already gone".to_string()));
        }
        Ok(())
    }

    fn delete_companions(&self, item: &ArtifactLocation) -> usize {
        let Ok(entries) = fs::read_dir(&item.folder) else {
            return 0;
        };
        let dotted = format!("{}.", item.base_name);
        let dashed = format!("{}-", item.base_name);

        let mut removed = 0;
        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let matches = name.starts_with(&dotted)
                || name.starts_with(&dashed)
                || self.options.bookkeeping_files.iter().any(|b| b == name);
            if matches && remove_quietly(&entry.path()) {
                removed += 1;
            }
        }
        removed
    }

    // ──────────────────── logging helpers ────────────────────

    fn log_event(&self, event: ActivityEvent) {
        if let Some(logger) = &self.logger {
            logger.send(event);
        }
    }
}

fn failure(item: &ArtifactLocation, code: &'static str, error: String) -> DeletionError {
    DeletionError {
        location: item.clone(),
        error_code: code,
        error,
    }
}

fn remove_quietly(path: &Path) -> bool {
    fs::remove_file(path).is_ok()
}
