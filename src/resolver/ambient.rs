//! The resolver's only window onto the outside world.
//!
//! Strategies never touch `std::env`, `std::process` or the filesystem
//! directly; they go through [`Ambient`] so tests can inject fixed answers.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Ambient inputs consulted while resolving the repository path.
pub trait Ambient {
    /// Run `program args…` and return its stdout when it exits successfully.
    ///
    /// The error string is a human-readable reason recorded in the attempt log.
    fn run_command(&self, program: &str, args: &[&str]) -> Result<String, String>;

    /// Value of an environment variable, `None` when unset or blank.
    fn env_var(&self, name: &str) -> Option<String>;

    /// Full text of a file.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// The current user's home directory.
    fn home_dir(&self) -> Option<PathBuf>;

    /// The process working directory.
    fn current_dir(&self) -> Option<PathBuf>;
}

/// [`Ambient`] backed by the real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAmbient;

impl Ambient for SystemAmbient {
    fn run_command(&self, program: &str, args: &[&str]) -> Result<String, String> {
        let mut command = Command::new(program);
        command.args(args);

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        let output = command
            .output()
            .map_err(|e| format!("{program} could not be started: {e}"))?;
        if !output.status.success() {
            return Err(format!("{program} exited with {}", output.status));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn env_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }

    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    fn current_dir(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }
}
