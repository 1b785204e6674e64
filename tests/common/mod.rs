#![allow(dead_code)]

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::time::{SystemTime, UNIX_EPOCH};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
    pub home: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_mcd") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "mcd.exe" } else { "mcd" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve mcd binary path for integration test"),
    }
}

/// Run `mcd` with an isolated environment: a fresh per-case home directory
/// (so no user config and no real `~/.m2`), no Maven installation hints, and
/// the activity log next to the case log.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CmdResult {
    run_cli_case_with_env(case_name, args, &[])
}

pub fn run_cli_case_with_env(case_name: &str, args: &[&str], env: &[(&str, &str)]) -> CmdResult {
    let root = std::env::temp_dir().join("mcd-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let case_id = format!("{}-{}", sanitize(case_name), now_millis());
    let log_path = root.join(format!("{case_id}.log"));
    let bin_path = resolve_bin_path();
    let home = root.join(format!("{case_id}-home"));
    fs::create_dir_all(&home).expect("create isolated home");

    let mut command = Command::new(&bin_path);
    command
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .env("HOME", &home)
        .env("USERPROFILE", &home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("MCD_ACTIVITY_LOG", root.join(format!("{case_id}.jsonl")))
        .env("MCD_RESOLVER_INFER_FROM_PATH", "false")
        .env_remove("MAVEN_HOME")
        .env_remove("M2_HOME")
        .env_remove("MCD_REPOSITORY")
        .env_remove("MCD_SCANNER_EXTRA_MARKERS")
        .env_remove("MCD_CLEANUP_CONFINE_TO_ROOT")
        .env_remove("MCD_ACTIVITY_LOG_ENABLED")
        .env_remove("MCD_OUTPUT_FORMAT");
    for (key, value) in env {
        command.env(key, value);
    }
    let output = command.output().expect("execute mcd command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("home={}\n", home.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
        home,
    }
}

// ──────────────────── repository fixtures ────────────────────

/// Bytes of a small, well-formed jar using `method` for every entry.
pub fn jar_bytes(method: CompressionMethod) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(method);
    writer
        .start_file("META-INF/MANIFEST.MF", options)
        .expect("start manifest");
    writer
        .write_all(b"Manifest-Version: 1.0\r\nCreated-By: fixture\r\n")
        .expect("write manifest");
    for i in 0..4 {
        writer
            .start_file(format!("com/acme/Class{i}.class"), options)
            .expect("start class");
        writer
            .write_all(&[0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 65].repeat(128))
            .expect("write class");
    }
    writer.finish().expect("finish jar").into_inner()
}

/// A jar cut off partway through, the way an interrupted download leaves it.
pub fn truncated_jar_bytes(method: CompressionMethod) -> Vec<u8> {
    let mut bytes = jar_bytes(method);
    bytes.truncate(bytes.len() * 2 / 3);
    bytes
}

pub const VALID_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>com.acme</groupId>
  <artifactId>lib</artifactId>
  <version>1.0</version>
</project>
"#;

pub const HARBOR_LOGIN_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Harbor</title></head>
<body><h1>Login to Harbor</h1></body>
</html>
"#;

/// Write `bytes` at `root/rel`, creating parent directories.
pub fn put(root: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("fixture has parent")).expect("create fixture dirs");
    fs::write(&path, bytes).expect("write fixture");
    path
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .expect("read fixture dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
