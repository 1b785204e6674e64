//! String-in, data-out entry points for embedding the doctor in other tools.
//!
//! Each call loads the configuration from its default location (plus `MCD_*`
//! overrides) and runs without an activity log. An unreadable or invalid
//! configuration is not an error here: the calls fall back to the defaults,
//! so `scan` only fails on an unusable root and `clean` never fails.

use std::path::Path;

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::resolver::PathResolver;
use crate::resolver::ambient::{Ambient, SystemAmbient};
use crate::scanner::artifact::{ArtifactLocation, InvalidArtifact};
use crate::scanner::cleanup::{CleanResult, CleanupExecutor, CleanupOptions};
use crate::scanner::engine::ScanEngine;

/// Absolute path of the local Maven repository, found through the full
/// resolution chain. The directory is not required to exist.
pub fn resolve_repository_path() -> Result<String> {
    resolve_with(&library_config(Config::load(None)), &SystemAmbient)
}

/// Every corrupted artifact under `repo_path`, in no particular order.
pub fn scan(repo_path: &str) -> Result<Vec<InvalidArtifact>> {
    scan_with(&library_config(Config::load(None)), repo_path)
}

/// Delete the given artifacts. Never fails as a whole; per-item failures are
/// reported in [`CleanResult::errors`].
pub fn clean(items: &[ArtifactLocation]) -> CleanResult {
    clean_with(&library_config(Config::load(None)), items)
}

fn library_config(loaded: Result<Config>) -> Config {
    loaded.unwrap_or_default()
}

fn resolve_with(config: &Config, ambient: &dyn Ambient) -> Result<String> {
    let resolution = PathResolver::from_config(&config.resolver).resolve(ambient)?;
    Ok(resolution.path.to_string_lossy().into_owned())
}

fn scan_with(config: &Config, repo_path: &str) -> Result<Vec<InvalidArtifact>> {
    ScanEngine::new(&config.scanner).scan(Path::new(repo_path))
}

fn clean_with(config: &Config, items: &[ArtifactLocation]) -> CleanResult {
    let options = CleanupOptions::from_config(&config.scanner, &config.cleanup, None);
    CleanupExecutor::new(options, None).clean(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::FakeAmbient;

    fn broken_env(name: &str) -> Option<String> {
        (name == "MCD_CLEANUP_CONFINE_TO_ROOT").then(|| "sure".to_string())
    }

    fn nowhere() -> std::path::PathBuf {
        std::env::temp_dir().join("mcd-api-no-such-config.toml")
    }

    #[test]
    fn malformed_override_falls_back_to_defaults() {
        let loaded = Config::load_with(None, broken_env);
        assert!(loaded.is_err());
        assert_eq!(library_config(loaded), Config::default());
    }

    #[test]
    fn scan_ignores_unrelated_config_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("g/a/1")).unwrap();
        std::fs::write(dir.path().join("g/a/1/a-1.jar"), b"").unwrap();

        let config = library_config(Config::load_with(None, broken_env));
        let found = scan_with(&config, &dir.path().to_string_lossy()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].base_name, "a-1");
    }

    #[test]
    fn scan_still_rejects_bad_roots() {
        let config = library_config(Config::load_with(None, broken_env));
        let err = scan_with(&config, "").unwrap_err();
        assert_eq!(err.code(), "MCD-2002");
    }

    #[test]
    fn resolve_ignores_unrelated_config_errors() {
        let config = library_config(Config::load_with(Some(&nowhere()), |_| None));
        let ambient = FakeAmbient::default().with_home("/nonexistent_home");
        assert_eq!(
            resolve_with(&config, &ambient).unwrap(),
            "/nonexistent_home/.m2/repository"
        );
    }

    #[test]
    fn clean_with_defaults_of_nothing_is_empty() {
        let config = library_config(Config::load_with(None, broken_env));
        assert_eq!(clean_with(&config, &[]), CleanResult::default());
    }
}
