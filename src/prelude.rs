//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use maven_cache_doctor::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{McdError, Result};

// Resolver
pub use crate::resolver::ambient::{Ambient, SystemAmbient};
pub use crate::resolver::{PathResolver, Resolution, Strategy};

// Scanner
pub use crate::scanner::archive::ArchiveValidator;
pub use crate::scanner::artifact::{ArtifactLocation, CorruptionReason, InvalidArtifact, Verdict};
pub use crate::scanner::cleanup::{CleanResult, CleanupExecutor, CleanupOptions, CleanupReport};
pub use crate::scanner::content::ContentHeuristic;
pub use crate::scanner::engine::{ScanEngine, ScanReport};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
pub use crate::logger::jsonl::JsonlConfig;
