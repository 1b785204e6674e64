//! Local repository path resolution through an ordered fallback chain.
//!
//! Each [`Strategy`] is a function of [`Ambient`] inputs to an optional path.
//! [`PathResolver::resolve`] tries them in order, records every attempt, and
//! returns the first success. Only exhaustion of the whole chain is an error.

#![allow(missing_docs)]

pub mod ambient;
pub mod settings;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::config::ResolverConfig;
use crate::core::errors::{McdError, Result};
use crate::core::paths::resolve_absolute_path;
use crate::resolver::ambient::Ambient;

/// One link in the resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// A path configured up front (`resolver.repository` / `MCD_REPOSITORY`).
    Explicit(PathBuf),
    /// Ask `mvn -v` for `Maven home:` and read its `conf/settings.xml`.
    VersionCommand { commands: Vec<String> },
    /// Maven homes from environment variables (and optionally `PATH`).
    MavenHomeEnv {
        vars: Vec<String>,
        infer_from_path: bool,
    },
    /// `~/.m2/settings.xml`, or an explicit per-user settings file.
    UserSettings { path: Option<PathBuf> },
    /// `~/.m2/repository`.
    DefaultLocation,
}

impl Strategy {
    /// Stable identifier used in logs and CLI output.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Explicit(_) => "explicit",
            Self::VersionCommand { .. } => "version-command",
            Self::MavenHomeEnv { .. } => "maven-home-env",
            Self::UserSettings { .. } => "user-settings",
            Self::DefaultLocation => "default-location",
        }
    }

    /// Try this strategy. `Err` carries the reason it was skipped.
    pub fn attempt(&self, ambient: &dyn Ambient) -> std::result::Result<PathBuf, String> {
        match self {
            Self::Explicit(path) => Ok(path.clone()),
            Self::VersionCommand { commands } => from_version_command(commands, ambient),
            Self::MavenHomeEnv {
                vars,
                infer_from_path,
            } => from_maven_homes(&candidate_homes(vars, *infer_from_path, ambient), ambient),
            Self::UserSettings { path } => {
                let settings = match path {
                    Some(p) => p.clone(),
                    None => ambient
                        .home_dir()
                        .ok_or_else(|| "home directory unknown".to_string())?
                        .join(".m2")
                        .join("settings.xml"),
                };
                read_settings(&settings, ambient)
            }
            Self::DefaultLocation => ambient
                .home_dir()
                .map(|home| home.join(".m2").join("repository"))
                .ok_or_else(|| "home directory unknown".to_string()),
        }
    }
}

/// Record of one strategy's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub strategy: &'static str,
    pub succeeded: bool,
    /// The path found, or why the strategy was skipped.
    pub detail: String,
}

/// A successful resolution plus the trail that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub path: PathBuf,
    pub strategy: &'static str,
    pub attempts: Vec<Attempt>,
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.succeeded { "ok" } else { "skip" };
        write!(f, "[{mark}] {}: {}", self.strategy, self.detail)
    }
}

/// Ordered chain of resolution strategies.
#[derive(Debug, Clone)]
pub struct PathResolver {
    strategies: Vec<Strategy>,
}

impl PathResolver {
    /// Resolver over an explicit strategy list.
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// The standard Maven chain, prefixed by an explicit override when configured.
    pub fn from_config(config: &ResolverConfig) -> Self {
        let mut strategies = Vec::with_capacity(5);
        if let Some(path) = &config.repository {
            strategies.push(Strategy::Explicit(path.clone()));
        }
        strategies.push(Strategy::VersionCommand {
            commands: config.maven_commands.clone(),
        });
        strategies.push(Strategy::MavenHomeEnv {
            vars: config.home_env_vars.clone(),
            infer_from_path: config.infer_from_path,
        });
        strategies.push(Strategy::UserSettings {
            path: config.user_settings.clone(),
        });
        strategies.push(Strategy::DefaultLocation);
        Self { strategies }
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Walk the chain; first success wins. The path is made absolute but not
    /// checked for existence.
    ///
    /// A relative explicit override is taken relative to the working
    /// directory; a relative path from a settings file relative to the home
    /// directory.
    pub fn resolve(&self, ambient: &dyn Ambient) -> Result<Resolution> {
        let mut attempts = Vec::with_capacity(self.strategies.len());
        let home = ambient.home_dir();
        let cwd = ambient.current_dir();

        for strategy in &self.strategies {
            match strategy.attempt(ambient) {
                Ok(path) => {
                    let base = match strategy {
                        Strategy::Explicit(_) => cwd.as_deref(),
                        _ => home.as_deref(),
                    };
                    let path = resolve_absolute_path(&path, base);
                    attempts.push(Attempt {
                        strategy: strategy.name(),
                        succeeded: true,
                        detail: path.display().to_string(),
                    });
                    return Ok(Resolution {
                        path,
                        strategy: strategy.name(),
                        attempts,
                    });
                }
                Err(reason) => attempts.push(Attempt {
                    strategy: strategy.name(),
                    succeeded: false,
                    detail: reason,
                }),
            }
        }

        Err(McdError::Resolution {
            attempts: attempts.len(),
            details: attempts
                .iter()
                .map(|a| format!("{}: {}", a.strategy, a.detail))
                .collect::<Vec<_>>()
                .join("; "),
        })
    }
}

fn from_version_command(
    commands: &[String],
    ambient: &dyn Ambient,
) -> std::result::Result<PathBuf, String> {
    if commands.is_empty() {
        return Err("no version command configured".to_string());
    }
    let mut reasons = Vec::new();
    for cmd in commands {
        let stdout = match ambient.run_command(cmd, &["-v"]) {
            Ok(out) => out,
            Err(reason) => {
                reasons.push(reason);
                continue;
            }
        };
        let Some(home) = parse_maven_home(&stdout) else {
            reasons.push(format!("{cmd} -v printed no 'Maven home:' line"));
            continue;
        };
        match read_settings(&global_settings(&home), ambient) {
            Ok(path) => return Ok(path),
            Err(reason) => reasons.push(reason),
        }
    }
    Err(reasons.join("; "))
}

fn from_maven_homes(homes: &[PathBuf], ambient: &dyn Ambient) -> std::result::Result<PathBuf, String> {
    if homes.is_empty() {
        return Err("no Maven home in environment".to_string());
    }
    let mut reasons = Vec::with_capacity(homes.len());
    for home in homes {
        match read_settings(&global_settings(home), ambient) {
            Ok(path) => return Ok(path),
            Err(reason) => reasons.push(reason),
        }
    }
    Err(reasons.join("; "))
}

/// Maven homes named by `vars`, then (optionally) inferred from `PATH`
/// entries such as `/opt/apache-maven-3.9.6/bin`.
fn candidate_homes(vars: &[String], infer_from_path: bool, ambient: &dyn Ambient) -> Vec<PathBuf> {
    let mut homes: Vec<PathBuf> = vars
        .iter()
        .filter_map(|name| ambient.env_var(name))
        .map(PathBuf::from)
        .collect();

    if !infer_from_path {
        return homes;
    }
    let Some(path_var) = ambient.env_var("PATH") else {
        return homes;
    };
    for entry in std::env::split_paths(&OsString::from(path_var)) {
        let lower = entry.to_string_lossy().to_lowercase();
        if !(lower.contains("maven") && lower.contains("bin")) {
            continue;
        }
        if let Some(parent) = entry.parent() {
            if !homes.iter().any(|h| h == parent) {
                homes.push(parent.to_path_buf());
            }
        }
    }
    homes
}

fn parse_maven_home(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .find_map(|line| line.trim().strip_prefix("Maven home:"))
        .map(str::trim)
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

fn global_settings(home: &Path) -> PathBuf {
    home.join("conf").join("settings.xml")
}

fn read_settings(path: &Path, ambient: &dyn Ambient) -> std::result::Result<PathBuf, String> {
    let xml = ambient
        .read_to_string(path)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    settings::local_repository(&xml, ambient).map_err(|reason| format!("{}: {reason}", path.display()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io;

    /// Deterministic [`Ambient`] for resolver tests.
    #[derive(Debug, Default)]
    pub(crate) struct FakeAmbient {
        commands: HashMap<String, String>,
        env: HashMap<String, String>,
        files: HashMap<PathBuf, String>,
        home: Option<PathBuf>,
        cwd: Option<PathBuf>,
    }

    impl FakeAmbient {
        pub(crate) fn with_command(mut self, program: &str, stdout: &str) -> Self {
            self.commands.insert(program.to_string(), stdout.to_string());
            self
        }

        pub(crate) fn with_env(mut self, name: &str, value: &str) -> Self {
            self.env.insert(name.to_string(), value.to_string());
            self
        }

        pub(crate) fn with_file(mut self, path: &str, contents: &str) -> Self {
            self.files.insert(PathBuf::from(path), contents.to_string());
            self
        }

        pub(crate) fn with_home(mut self, home: &str) -> Self {
            self.home = Some(PathBuf::from(home));
            self
        }

        pub(crate) fn with_cwd(mut self, cwd: &str) -> Self {
            self.cwd = Some(PathBuf::from(cwd));
            self
        }
    }

    impl Ambient for FakeAmbient {
        fn run_command(&self, program: &str, _args: &[&str]) -> std::result::Result<String, String> {
            self.commands
                .get(program)
                .cloned()
                .ok_or_else(|| format!("{program} could not be started: not found"))
        }

        fn env_var(&self, name: &str) -> Option<String> {
            self.env.get(name).cloned()
        }

        fn read_to_string(&self, path: &Path) -> io::Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such file"))
        }

        fn home_dir(&self) -> Option<PathBuf> {
            self.home.clone()
        }

        fn current_dir(&self) -> Option<PathBuf> {
            self.cwd.clone()
        }
    }

    fn settings_with(repo: &str) -> String {
        format!("<settings><localRepository>{repo}</localRepository></settings>")
    }

    const MVN_V: &str = "Apache Maven 3.9.6 (bc0240f3c744dd6b6ec2920b3cd08dcc295161ae)
Maven home: /opt/maven
Java version: 21.0.2, vendor: Eclipse Adoptium
";

    fn default_chain() -> PathResolver {
        PathResolver::from_config(&ResolverConfig {
            maven_commands: vec!["mvn".to_string()],
            ..ResolverConfig::default()
        })
    }

    #[test]
    fn version_command_wins_when_settings_configure_repo() {
        let ambient = FakeAmbient::default()
            .with_home("/nonexistent_home")
            .with_command("mvn", MVN_V)
            .with_file("/opt/maven/conf/settings.xml", &settings_with("/srv/m2"))
            .with_file(
                "/nonexistent_home/.m2/settings.xml",
                &settings_with("/user/m2"),
            );

        let resolution = default_chain().resolve(&ambient).unwrap();
        assert_eq!(resolution.path, PathBuf::from("/srv/m2"));
        assert_eq!(resolution.strategy, "version-command");
        assert_eq!(resolution.attempts.len(), 1);
    }

    #[test]
    fn maven_home_env_used_when_command_missing() {
        let ambient = FakeAmbient::default()
            .with_home("/nonexistent_home")
            .with_env("M2_HOME", "/usr/share/maven")
            .with_file(
                "/usr/share/maven/conf/settings.xml",
                &settings_with("/var/cache/m2"),
            );

        let resolution = default_chain().resolve(&ambient).unwrap();
        assert_eq!(resolution.path, PathBuf::from("/var/cache/m2"));
        assert_eq!(resolution.strategy, "maven-home-env");
        assert!(!resolution.attempts[0].succeeded);
    }

    #[test]
    fn maven_home_inferred_from_path_entries() {
        let path_var = std::env::join_paths(["/usr/bin", "/opt/apache-maven-3.9.6/bin"])
            .unwrap()
            .to_string_lossy()
            .into_owned();
        let ambient = FakeAmbient::default()
            .with_home("/nonexistent_home")
            .with_env("PATH", &path_var)
            .with_file(
                "/opt/apache-maven-3.9.6/conf/settings.xml",
                &settings_with("/from/path"),
            );

        let resolution = default_chain().resolve(&ambient).unwrap();
        assert_eq!(resolution.path, PathBuf::from("/from/path"));
        assert_eq!(resolution.strategy, "maven-home-env");
    }

    #[test]
    fn path_inference_can_be_disabled() {
        let path_var = "/opt/apache-maven-3.9.6/bin".to_string();
        let ambient = FakeAmbient::default()
            .with_env("PATH", &path_var)
            .with_file(
                "/opt/apache-maven-3.9.6/conf/settings.xml",
                &settings_with("/from/path"),
            );
        let strategy = Strategy::MavenHomeEnv {
            vars: vec![],
            infer_from_path: false,
        };
        assert!(strategy.attempt(&ambient).is_err());
    }

    #[test]
    fn user_settings_then_default() {
        let ambient = FakeAmbient::default()
            .with_home("/nonexistent_home")
            .with_file(
                "/nonexistent_home/.m2/settings.xml",
                &settings_with("${user.home}/m2-alt"),
            );
        let resolution = default_chain().resolve(&ambient).unwrap();
        assert_eq!(resolution.path, PathBuf::from("/nonexistent_home/m2-alt"));
        assert_eq!(resolution.strategy, "user-settings");

        let bare = FakeAmbient::default().with_home("/nonexistent_home");
        let resolution = default_chain().resolve(&bare).unwrap();
        assert_eq!(
            resolution.path,
            PathBuf::from("/nonexistent_home/.m2/repository")
        );
        assert_eq!(resolution.strategy, "default-location");
        assert_eq!(resolution.attempts.len(), 4);
    }

    #[test]
    fn commented_global_settings_fall_through() {
        let ambient = FakeAmbient::default()
            .with_home("/nonexistent_home")
            .with_command("mvn", MVN_V)
            .with_file(
                "/opt/maven/conf/settings.xml",
                "<settings><!-- <localRepository>/path/to/local/repo</localRepository> --></settings>",
            );
        let resolution = default_chain().resolve(&ambient).unwrap();
        assert_eq!(resolution.strategy, "default-location");
        assert!(resolution.attempts[0].detail.contains("no <localRepository>"));
    }

    #[test]
    fn explicit_override_short_circuits() {
        let resolver = PathResolver::from_config(&ResolverConfig {
            repository: Some(PathBuf::from("/explicit/repo")),
            ..ResolverConfig::default()
        });
        let resolution = resolver.resolve(&FakeAmbient::default()).unwrap();
        assert_eq!(resolution.path, PathBuf::from("/explicit/repo"));
        assert_eq!(resolution.strategy, "explicit");
    }

    #[test]
    fn relative_override_is_taken_from_working_directory() {
        let resolver = PathResolver::from_config(&ResolverConfig {
            repository: Some(PathBuf::from("./repo")),
            ..ResolverConfig::default()
        });
        let ambient = FakeAmbient::default()
            .with_home("/nonexistent_home")
            .with_cwd("/nonexistent_work/project");
        let resolution = resolver.resolve(&ambient).unwrap();
        assert_eq!(
            resolution.path,
            PathBuf::from("/nonexistent_work/project/repo")
        );
    }

    #[test]
    fn relative_repository_is_made_absolute_against_home() {
        let ambient = FakeAmbient::default()
            .with_home("/nonexistent_home")
            .with_file("/nonexistent_home/.m2/settings.xml", &settings_with("cache/m2"));
        let resolution = default_chain().resolve(&ambient).unwrap();
        assert!(resolution.path.is_absolute());
        assert_eq!(resolution.path, PathBuf::from("/nonexistent_home/cache/m2"));
    }

    #[test]
    fn exhausted_chain_is_resolution_error() {
        let err = default_chain().resolve(&FakeAmbient::default()).unwrap_err();
        match err {
            McdError::Resolution { attempts, details } => {
                assert_eq!(attempts, 4);
                assert!(details.contains("default-location"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn maven_home_parsing_tolerates_padding() {
        assert_eq!(
            parse_maven_home("  Maven home:   /opt/maven  \n"),
            Some(PathBuf::from("/opt/maven"))
        );
        assert_eq!(parse_maven_home("Apache Maven 3.9.6\n"), None);
        assert_eq!(parse_maven_home("Maven home:\n"), None);
    }
}
