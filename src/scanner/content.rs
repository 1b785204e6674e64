//! Marker search over descriptor files (`.pom`).
//!
//! A misconfigured proxy answers artifact requests with its login or error
//! page and the build tool stores that HTML under the artifact's name.

use std::fs;
use std::io;
use std::path::Path;

use memchr::memmem::Finder;

use crate::scanner::artifact::{CorruptionReason, Verdict};

/// Built-in markers in match-priority order: `(bytes, category)`.
pub const BUILTIN_MARKERS: &[(&str, &str)] = &[
    ("<!DOCTYPE html>", "html doctype"),
    ("<title>Harbor</title>", "harbor title"),
    ("Login to Harbor", "harbor login"),
];

struct Marker {
    finder: Finder<'static>,
    category: String,
}

/// Case-sensitive substring search for error-page markers.
pub struct ContentHeuristic {
    markers: Vec<Marker>,
}

impl ContentHeuristic {
    /// Heuristic over the built-in markers followed by `extra` ones, each
    /// labelled with its own text.
    pub fn new(extra: &[String]) -> Self {
        let builtin = BUILTIN_MARKERS
            .iter()
            .map(|(needle, category)| ((*needle).to_string(), (*category).to_string()));
        let extra = extra
            .iter()
            .filter(|m| !m.is_empty())
            .map(|m| (m.clone(), m.clone()));
        let markers = builtin
            .chain(extra)
            .map(|(needle, category)| Marker {
                finder: Finder::new(needle.as_bytes()).into_owned(),
                category,
            })
            .collect();
        Self { markers }
    }

    /// Read the whole file and check it for markers.
    pub fn validate(&self, path: &Path) -> io::Result<Verdict> {
        let bytes = fs::read(path)?;
        Ok(self.inspect(&bytes))
    }

    /// First marker found in `bytes`, in priority order.
    pub fn inspect(&self, bytes: &[u8]) -> Verdict {
        self.markers
            .iter()
            .find(|marker| marker.finder.find(bytes).is_some())
            .map_or(Verdict::Valid, |marker| {
                Verdict::Invalid(CorruptionReason::ProxyErrorPage(marker.category.clone()))
            })
    }
}

impl Default for ContentHeuristic {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl std::fmt::Debug for ContentHeuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHeuristic")
            .field(
                "categories",
                &self.markers.iter().map(|m| m.category.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
