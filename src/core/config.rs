//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{McdError, Result};

/// Full MCD configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub resolver: ResolverConfig,
    pub scanner: ScannerConfig,
    pub cleanup: CleanupConfig,
    pub paths: PathsConfig,
}

/// Inputs to the repository path fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Explicit repository path; skips every other strategy when set.
    pub repository: Option<PathBuf>,
    /// Executables tried in order for the `-v` probe.
    pub maven_commands: Vec<String>,
    /// Environment variables that may point at a Maven installation.
    pub home_env_vars: Vec<String>,
    /// Also derive Maven homes from `PATH` entries like `.../maven/bin`.
    pub infer_from_path: bool,
    /// Override for the per-user settings file (default `~/.m2/settings.xml`).
    pub user_settings: Option<PathBuf>,
}

/// File classification knobs for the scan engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Extensions (without dot) checked as zip containers.
    pub archive_extensions: Vec<String>,
    /// Extensions (without dot) checked for proxy error pages.
    pub descriptor_extensions: Vec<String>,
    /// Additional error-page markers, matched case-sensitively.
    pub extra_markers: Vec<String>,
}

/// Deletion behavior.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CleanupConfig {
    /// Refuse to delete anything outside the repository root.
    pub confine_to_root: bool,
    /// Per-folder resolver bookkeeping files removed alongside an artifact.
    pub bookkeeping_files: Vec<String>,
}

/// Filesystem paths used by mcd.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub activity_log: PathBuf,
    pub activity_log_enabled: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let maven_commands = if cfg!(target_os = "windows") {
            vec!["mvn.cmd".to_string(), "mvn.bat".to_string(), "mvn".to_string()]
        } else {
            vec!["mvn".to_string()]
        };
        Self {
            repository: None,
            maven_commands,
            home_env_vars: vec!["MAVEN_HOME".to_string(), "M2_HOME".to_string()],
            infer_from_path: true,
            user_settings: None,
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            archive_extensions: vec!["jar".to_string()],
            descriptor_extensions: vec!["pom".to_string()],
            extra_markers: Vec::new(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            confine_to_root: true,
            bookkeeping_files: vec![
                "_remote.repositories".to_string(),
                "_maven.repositories".to_string(),
                "resolver-status.properties".to_string(),
            ],
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| {
            eprintln!("[MCD-CONFIG] WARNING: home directory unknown, falling back to temp dir");
            env::temp_dir()
        });
        Self {
            config_file: home_dir.join(".config").join("mcd").join("config.toml"),
            activity_log: home_dir
                .join(".local")
                .join("share")
                .join("mcd")
                .join("activity.jsonl"),
            activity_log_enabled: true,
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`Config::load`] with environment lookups routed through `lookup`.
    pub(crate) fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| McdError::Io {
                path: path_buf.clone(),
                source,
            })?;
            toml::from_str::<Self>(&raw)?
        } else if path.is_some() {
            return Err(McdError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic FNV-1a hash of the effective config, recorded in the activity log.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Render the effective config as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("MCD_REPOSITORY") {
            self.resolver.repository = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("MCD_RESOLVER_INFER_FROM_PATH") {
            self.resolver.infer_from_path = parse_env_bool("MCD_RESOLVER_INFER_FROM_PATH", &raw)?;
        }
        if let Some(raw) = lookup("MCD_SCANNER_EXTRA_MARKERS") {
            self.scanner.extra_markers = raw
                .split(';')
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup("MCD_CLEANUP_CONFINE_TO_ROOT") {
            self.cleanup.confine_to_root = parse_env_bool("MCD_CLEANUP_CONFINE_TO_ROOT", &raw)?;
        }
        if let Some(raw) = lookup("MCD_ACTIVITY_LOG") {
            self.paths.activity_log = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MCD_ACTIVITY_LOG_ENABLED") {
            self.paths.activity_log_enabled = parse_env_bool("MCD_ACTIVITY_LOG_ENABLED", &raw)?;
        }
        Ok(())
    }

    /// Strip leading dots from extensions so `.jar` and `jar` mean the same.
    fn normalize(&mut self) {
        for ext in self
            .scanner
            .archive_extensions
            .iter_mut()
            .chain(self.scanner.descriptor_extensions.iter_mut())
        {
            if let Some(stripped) = ext.strip_prefix('.') {
                *ext = stripped.to_string();
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.scanner.archive_extensions.is_empty() && self.scanner.descriptor_extensions.is_empty()
        {
            return Err(McdError::InvalidConfig {
                details: "scanner needs at least one archive or descriptor extension".to_string(),
            });
        }

        for ext in self
            .scanner
            .archive_extensions
            .iter()
            .chain(&self.scanner.descriptor_extensions)
        {
            if ext.is_empty() || ext.contains(['/', '\\', '.']) {
                return Err(McdError::InvalidConfig {
                    details: format!("scanner extension {ext:?} must be a bare suffix like \"jar\""),
                });
            }
        }

        if let Some(ext) = self
            .scanner
            .archive_extensions
            .iter()
            .find(|ext| self.scanner.descriptor_extensions.contains(ext))
        {
            return Err(McdError::InvalidConfig {
                details: format!("extension {ext:?} is listed as both archive and descriptor"),
            });
        }

        if self.scanner.extra_markers.iter().any(String::is_empty) {
            return Err(McdError::InvalidConfig {
                details: "scanner.extra_markers must not contain empty strings".to_string(),
            });
        }

        for name in &self.cleanup.bookkeeping_files {
            if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(McdError::InvalidConfig {
                    details: format!("cleanup.bookkeeping_files entry {name:?} must be a plain file name"),
                });
            }
        }

        if self
            .resolver
            .repository
            .as_ref()
            .is_some_and(|p| p.as_os_str().is_empty())
        {
            return Err(McdError::InvalidConfig {
                details: "resolver.repository must not be empty when set".to_string(),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| McdError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
