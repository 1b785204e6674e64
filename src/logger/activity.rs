//! Activity logger: a dedicated thread owns the `JsonlWriter`; everything else
//! sends `ActivityEvent`s over a bounded crossbeam channel.
//!
//! `send()` uses `try_send()` so scan workers and the cleanup loop are never
//! blocked by a slow disk under the log file.

#![allow(missing_docs)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use crate::core::errors::{McdError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};

/// Default bounded channel capacity for log events.
const CHANNEL_CAPACITY: usize = 1024;

/// Events emitted by the resolver, scan engine and cleanup executor.
#[derive(Debug, Clone)]
pub enum ActivityEvent {
    SessionStarted {
        version: String,
        config_hash: String,
    },
    RepositoryResolved {
        path: String,
        strategy: String,
    },
    ArtifactFlagged {
        folder: String,
        base_name: String,
        reason: String,
    },
    ScanCompleted {
        root: String,
        files_checked: u64,
        invalid_found: u64,
        duration_ms: u64,
    },
    ArtifactDeleted {
        folder: String,
        base_name: String,
        companions_removed: u64,
    },
    ArtifactDeletionFailed {
        folder: String,
        base_name: String,
        error_code: String,
        error_message: String,
    },
    CleanCompleted {
        deleted: u64,
        failed: u64,
        duplicates_skipped: u64,
        duration_ms: u64,
    },
    Error {
        code: String,
        message: String,
    },
    /// Sentinel asking the logger thread to flush and exit.
    Shutdown,
}

/// Cheaply-cloneable handle for sending log events from any thread.
#[derive(Debug, Clone)]
pub struct ActivityLoggerHandle {
    tx: Sender<ActivityEvent>,
    dropped_events: Arc<AtomicU64>,
}

impl ActivityLoggerHandle {
    /// Send an event to the logger thread. Non-blocking; drops on back-pressure.
    pub fn send(&self, event: ActivityEvent) {
        if let Err(TrySendError::Full(_)) = self.tx.try_send(event) {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of events dropped because the channel was full.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Ask the logger thread to flush and stop. Blocks only until the
    /// sentinel is queued.
    pub fn shutdown(&self) {
        let _ = self.tx.send(ActivityEvent::Shutdown);
    }
}

/// Spawn the logger thread writing to the JSONL file described by `config`.
pub fn spawn_logger(config: JsonlConfig) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    spawn_logger_with_capacity(config, CHANNEL_CAPACITY)
}

fn spawn_logger_with_capacity(
    config: JsonlConfig,
    capacity: usize,
) -> Result<(ActivityLoggerHandle, thread::JoinHandle<()>)> {
    let (tx, rx) = bounded::<ActivityEvent>(capacity);
    let handle = ActivityLoggerHandle {
        tx,
        dropped_events: Arc::new(AtomicU64::new(0)),
    };

    let join = thread::Builder::new()
        .name("mcd-logger".to_string())
        .spawn(move || logger_thread_main(&rx, config))
        .map_err(|e| McdError::Runtime {
            details: format!("failed to spawn logger thread: {e}"),
        })?;

    Ok((handle, join))
}

#[allow(clippy::needless_pass_by_value)]
fn logger_thread_main(rx: &Receiver<ActivityEvent>, config: JsonlConfig) {
    let mut writer = JsonlWriter::open(config);
    // Exits on the Shutdown sentinel or once every handle is dropped.
    while let Ok(event) = rx.recv() {
        if matches!(event, ActivityEvent::Shutdown) {
            break;
        }
        writer.write_entry(&to_entry(event));
    }
    writer.flush();
}

fn to_entry(event: ActivityEvent) -> LogEntry {
    match event {
        ActivityEvent::SessionStarted {
            version,
            config_hash,
        } => {
            let mut e = LogEntry::new(EventType::SessionStart, Severity::Info);
            e.details = Some(format!("version={version} config_hash={config_hash}"));
            e
        }
        ActivityEvent::RepositoryResolved { path, strategy } => {
            let mut e = LogEntry::new(EventType::RepositoryResolved, Severity::Info);
            e.path = Some(path);
            e.strategy = Some(strategy);
            e
        }
        ActivityEvent::ArtifactFlagged {
            folder,
            base_name,
            reason,
        } => {
            let mut e = LogEntry::new(EventType::ArtifactFlagged, Severity::Warning);
            e.path = Some(folder);
            e.base_name = Some(base_name);
            e.reason = Some(reason);
            e
        }
        ActivityEvent::ScanCompleted {
            root,
            files_checked,
            invalid_found,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::ScanComplete, Severity::Info);
            e.path = Some(root);
            e.count = Some(files_checked);
            e.failed = Some(invalid_found);
            e.duration_ms = Some(duration_ms);
            e
        }
        ActivityEvent::ArtifactDeleted {
            folder,
            base_name,
            companions_removed,
        } => {
            let mut e = LogEntry::new(EventType::ArtifactDelete, Severity::Info);
            e.path = Some(folder);
            e.base_name = Some(base_name);
            e.count = Some(companions_removed);
            e
        }
        ActivityEvent::ArtifactDeletionFailed {
            folder,
            base_name,
            error_code,
            error_message,
        } => {
            let mut e = LogEntry::new(EventType::ArtifactDeleteFailed, Severity::Error);
            e.path = Some(folder);
            e.base_name = Some(base_name);
            e.error_code = Some(error_code);
            e.error_message = Some(error_message);
            e
        }
        ActivityEvent::CleanCompleted {
            deleted,
            failed,
            duplicates_skipped,
            duration_ms,
        } => {
            let mut e = LogEntry::new(EventType::CleanComplete, Severity::Info);
            e.count = Some(deleted);
            e.failed = Some(failed);
            e.duration_ms = Some(duration_ms);
            if duplicates_skipped > 0 {
                e.details = Some(format!("duplicates_skipped={duplicates_skipped}"));
            }
            e
        }
        ActivityEvent::Error { code, message } => {
            let mut e = LogEntry::new(EventType::Error, Severity::Error);
            e.error_code = Some(code);
            e.error_message = Some(message);
            e
        }
        ActivityEvent::Shutdown => LogEntry::new(EventType::Error, Severity::Info),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read_events(path: &std::path::Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn events_are_written_in_order_and_flushed_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let (handle, join) = spawn_logger(JsonlConfig {
            fallback_path: None,
            ..JsonlConfig::at(&path)
        })
        .unwrap();

        handle.send(ActivityEvent::RepositoryResolved {
            path: "/home/dev/.m2/repository".to_string(),
            strategy: "default-location".to_string(),
        });
        handle.send(ActivityEvent::ArtifactFlagged {
            folder: "/home/dev/.m2/repository/com/acme/lib/1.0".to_string(),
            base_name: "lib-1.0".to_string(),
            reason: "contains proxy error page: html doctype".to_string(),
        });
        handle.shutdown();
        join.join().unwrap();

        let events = read_events(&path);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], "repository_resolved");
        assert_eq!(events[0]["strategy"], "default-location");
        assert_eq!(events[1]["event"], "artifact_flagged");
        assert_eq!(events[1]["base_name"], "lib-1.0");
    }

    #[test]
    fn dropping_all_handles_stops_the_thread() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let (handle, join) = spawn_logger(JsonlConfig::at(&path)).unwrap();
        handle.send(ActivityEvent::Error {
            code: "MCD-3900".to_string(),
            message: "boom".to_string(),
        });
        drop(handle);
        join.join().unwrap();

        let events = read_events(&path);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["error_code"], "MCD-3900");
    }

    #[test]
    fn full_channel_counts_dropped_events() {
        // Zero-capacity channel with nobody receiving yet: every try_send fails as Full
        // until the logger thread is parked in recv().
        let (tx, _rx) = bounded::<ActivityEvent>(0);
        let handle = ActivityLoggerHandle {
            tx,
            dropped_events: Arc::new(AtomicU64::new(0)),
        };
        handle.send(ActivityEvent::Shutdown);
        handle.send(ActivityEvent::Shutdown);
        assert_eq!(handle.dropped_events(), 2);
    }
}
