//! Repository scan: one traversal loop feeding a fixed worker pool.
//!
//! The traversal runs depth-first on the calling thread and pushes candidate
//! files into a bounded crossbeam channel. Workers validate each file and
//! append findings to a shared sink. A validator I/O error is a soft skip:
//! counted in the report, never surfaced as an error.

#![allow(missing_docs)]

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel as channel;
use parking_lot::Mutex;

use crate::core::config::ScannerConfig;
use crate::core::errors::{McdError, Result};
use crate::core::paths::is_hidden_name;
use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle};
use crate::scanner::archive::ArchiveValidator;
use crate::scanner::artifact::{InvalidArtifact, Verdict, split_artifact_path};
use crate::scanner::content::ContentHeuristic;

/// Workers per available CPU; validation is mostly waiting on disk.
const WORKERS_PER_CPU: usize = 4;

/// Candidates buffered per worker before the traversal blocks.
const QUEUE_DEPTH_PER_WORKER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateKind {
    Archive,
    Descriptor,
}

#[derive(Debug)]
struct Candidate {
    path: PathBuf,
    folder: PathBuf,
    base_name: String,
    kind: CandidateKind,
}

/// Everything a scan found plus its counters.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Flagged artifacts in no particular order.
    pub artifacts: Vec<InvalidArtifact>,
    /// Candidate files a validator gave a verdict on.
    pub files_checked: u64,
    /// Candidate files that could not be read.
    pub files_skipped: u64,
    pub worker_count: usize,
    pub duration: Duration,
}

#[derive(Default)]
struct Counters {
    checked: AtomicU64,
    skipped: AtomicU64,
}

/// Walks a repository and flags corrupted archives and descriptors.
#[derive(Debug)]
pub struct ScanEngine {
    archive_extensions: Vec<String>,
    descriptor_extensions: Vec<String>,
    archive: ArchiveValidator,
    content: ContentHeuristic,
    logger: Option<ActivityLoggerHandle>,
}

impl ScanEngine {
    pub fn new(config: &ScannerConfig) -> Self {
        Self {
            archive_extensions: config.archive_extensions.clone(),
            descriptor_extensions: config.descriptor_extensions.clone(),
            archive: ArchiveValidator,
            content: ContentHeuristic::new(&config.extra_markers),
            logger: None,
        }
    }

    /// Report flagged artifacts and scan completion to the activity log.
    #[must_use]
    pub fn with_logger(mut self, logger: ActivityLoggerHandle) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Pool size used by every scan: available parallelism times four.
    pub fn worker_count() -> usize {
        thread::available_parallelism().map_or(1, NonZeroUsize::get) * WORKERS_PER_CPU
    }

    /// Scan `root` and return only the flagged artifacts.
    pub fn scan(&self, root: &Path) -> Result<Vec<InvalidArtifact>> {
        Ok(self.scan_with_report(root)?.artifacts)
    }

    /// Scan `root`, blocking until every candidate has been validated.
    pub fn scan_with_report(&self, root: &Path) -> Result<ScanReport> {
        check_root(root)?;
        let start = Instant::now();
        let worker_count = Self::worker_count();

        let sink = Mutex::new(Vec::new());
        let counters = Counters::default();
        let (tx, rx) = channel::bounded::<Candidate>(worker_count * QUEUE_DEPTH_PER_WORKER);

        thread::scope(|scope| -> Result<()> {
            for i in 0..worker_count {
                let rx = rx.clone();
                let (sink, counters) = (&sink, &counters);
                thread::Builder::new()
                    .name(format!("mcd-scan-{i}"))
                    .spawn_scoped(scope, move || self.worker(&rx, sink, counters))
                    .map_err(|e| McdError::Runtime {
                        details: format!("failed to spawn scan worker: {e}"),
                    })?;
            }
            drop(rx);
            self.traverse(root, &tx);
            drop(tx);
            Ok(())
        })?;

        let report = ScanReport {
            artifacts: sink.into_inner(),
            files_checked: counters.checked.into_inner(),
            files_skipped: counters.skipped.into_inner(),
            worker_count,
            duration: start.elapsed(),
        };

        #[allow(clippy::cast_possible_truncation)]
        let duration_ms = report.duration.as_millis() as u64;
        self.log(ActivityEvent::ScanCompleted {
            root: root.display().to_string(),
            files_checked: report.files_checked,
            invalid_found: report.artifacts.len() as u64,
            duration_ms,
        });
        Ok(report)
    }

    /// Depth-first walk. Hidden directories and symlinks are never entered,
    /// unreadable directories are skipped.
    fn traverse(&self, root: &Path, tx: &channel::Sender<Candidate>) {
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if file_type.is_dir() {
                    if !is_hidden_name(&entry.file_name()) {
                        stack.push(entry.path());
                    }
                } else if file_type.is_file() {
                    if let Some(candidate) = self.classify(entry.path()) {
                        // All workers gone; nothing left to feed.
                        if tx.send(candidate).is_err() {
                            return;
                        }
                    }
                }
            }
        }
    }

    fn classify(&self, path: PathBuf) -> Option<Candidate> {
        let kinds = self
            .archive_extensions
            .iter()
            .map(|ext| (ext, CandidateKind::Archive))
            .chain(
                self.descriptor_extensions
                    .iter()
                    .map(|ext| (ext, CandidateKind::Descriptor)),
            );
        for (ext, kind) in kinds {
            if let Some((folder, base_name)) = split_artifact_path(&path, ext) {
                return Some(Candidate {
                    path,
                    folder,
                    base_name,
                    kind,
                });
            }
        }
        None
    }

    fn worker(
        &self,
        rx: &channel::Receiver<Candidate>,
        sink: &Mutex<Vec<InvalidArtifact>>,
        counters: &Counters,
    ) {
        while let Ok(candidate) = rx.recv() {
            let verdict = match candidate.kind {
                CandidateKind::Archive => self.archive.validate(&candidate.path),
                CandidateKind::Descriptor => self.content.validate(&candidate.path),
            };
            let reason = match verdict {
                Ok(Verdict::Valid) => {
                    counters.checked.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
                Ok(Verdict::Invalid(reason)) => {
                    counters.checked.fetch_add(1, Ordering::Relaxed);
                    reason
                }
                Err(_) => {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };

            let artifact = InvalidArtifact {
                folder: candidate.folder,
                base_name: candidate.base_name,
                reason,
            };
            self.log(ActivityEvent::ArtifactFlagged {
                folder: artifact.folder.display().to_string(),
                base_name: artifact.base_name.clone(),
                reason: artifact.reason.to_string(),
            });
            sink.lock().push(artifact);
        }
    }

    fn log(&self, event: ActivityEvent) {
        if let Some(logger) = &self.logger {
            logger.send(event);
        }
    }
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new(&ScannerConfig::default())
    }
}

fn check_root(root: &Path) -> Result<()> {
    if root.as_os_str().is_empty() {
        return Err(McdError::scan_root(root, "empty path"));
    }
    let meta = fs::metadata(root).map_err(|e| McdError::scan_root(root, e.to_string()))?;
    if !meta.is_dir() {
        return Err(McdError::scan_root(root, "not a directory"));
    }
    Ok(())
}
