//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use maven_cache_doctor::core::config::Config;
use maven_cache_doctor::core::errors::McdError;
use maven_cache_doctor::logger::activity::{ActivityEvent, ActivityLoggerHandle, spawn_logger};
use maven_cache_doctor::logger::jsonl::JsonlConfig;
use maven_cache_doctor::resolver::ambient::SystemAmbient;
use maven_cache_doctor::resolver::{PathResolver, Resolution};
use maven_cache_doctor::scanner::artifact::ArtifactLocation;
use maven_cache_doctor::scanner::cleanup::{CleanupExecutor, CleanupOptions, CleanupReport};
use maven_cache_doctor::scanner::engine::{ScanEngine, ScanReport};

/// Maven Cache Doctor: finds and removes corrupted local repository artifacts.
#[derive(Debug, Parser)]
#[command(
    name = "mcd",
    author,
    version,
    about = "Maven Cache Doctor - corrupted local repository cleaner",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Increase verbosity.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Quiet mode (errors only).
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print the local repository path (-v lists every strategy tried).
    Resolve,
    /// Report corrupted artifacts without touching anything.
    Scan(ScanArgs),
    /// Delete corrupted artifacts and their companion files.
    Clean(CleanArgs),
    /// Inspect effective configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct ScanArgs {
    /// Repository to scan (resolved automatically when omitted).
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Args, Default)]
struct CleanArgs {
    /// Repository to clean (resolved automatically when omitted).
    #[arg(value_name = "PATH")]
    path: Option<PathBuf>,
    /// Read the items to delete from a `scan --json` payload or a JSON array
    /// of `{folder, base_name}` objects instead of scanning.
    #[arg(long, value_name = "FILE")]
    from: Option<PathBuf>,
    /// Skip interactive confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<McdError> for CliError {
    fn from(err: McdError) -> Self {
        match err {
            McdError::InvalidConfig { .. }
            | McdError::MissingConfig { .. }
            | McdError::ConfigParse { .. } => Self::User(err.to_string()),
            _ => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Resolve => with_session(cli, |session| run_resolve(cli, session)),
        Command::Scan(args) => with_session(cli, |session| run_scan(cli, session, args)),
        Command::Clean(args) => with_session(cli, |session| run_clean(cli, session, args)),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Session: config + activity logger shared by resolve/scan/clean
// ---------------------------------------------------------------------------

struct Session {
    config: Config,
    logger: Option<(ActivityLoggerHandle, JoinHandle<()>)>,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        if cli.verbose {
            eprintln!("[MCD-CONFIG] using {}", config.paths.config_file.display());
        }

        let logger = if config.paths.activity_log_enabled {
            match spawn_logger(JsonlConfig::at(&config.paths.activity_log)) {
                Ok(pair) => Some(pair),
                Err(e) => {
                    eprintln!("[MCD-LOG] activity log disabled: {e}");
                    None
                }
            }
        } else {
            None
        };

        let session = Self { config, logger };
        session.log(ActivityEvent::SessionStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            config_hash: session.config.stable_hash().unwrap_or_default(),
        });
        Ok(session)
    }

    fn handle(&self) -> Option<ActivityLoggerHandle> {
        self.logger.as_ref().map(|(handle, _)| handle.clone())
    }

    fn log(&self, event: ActivityEvent) {
        if let Some((handle, _)) = &self.logger {
            handle.send(event);
        }
    }

    fn close(self, verbose: bool) {
        let Some((handle, join)) = self.logger else {
            return;
        };
        let dropped = handle.dropped_events();
        handle.shutdown();
        drop(handle);
        if join.join().is_err() {
            eprintln!("[MCD-LOG] logger thread panicked");
        }
        if verbose && dropped > 0 {
            eprintln!("[MCD-LOG] {dropped} activity events dropped under back-pressure");
        }
    }

    /// Explicit path from the command line, else the resolution chain.
    fn repository(&self, cli: &Cli, explicit: Option<&Path>) -> Result<PathBuf, CliError> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        Ok(self.resolve(cli)?.path)
    }

    fn resolve(&self, cli: &Cli) -> Result<Resolution, CliError> {
        let resolver = PathResolver::from_config(&self.config.resolver);
        let resolution = resolver.resolve(&SystemAmbient).inspect_err(|e| {
            self.log(ActivityEvent::Error {
                code: e.code().to_string(),
                message: e.to_string(),
            });
        })?;
        if cli.verbose {
            eprintln!(
                "[MCD-RESOLVE] {} via {}",
                resolution.path.display(),
                resolution.strategy
            );
        }
        self.log(ActivityEvent::RepositoryResolved {
            path: resolution.path.display().to_string(),
            strategy: resolution.strategy.to_string(),
        });
        Ok(resolution)
    }
}

fn with_session<F>(cli: &Cli, body: F) -> Result<(), CliError>
where
    F: FnOnce(&Session) -> Result<(), CliError>,
{
    let session = Session::open(cli)?;
    let outcome = body(&session);
    session.close(cli.verbose);
    outcome
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

fn run_resolve(cli: &Cli, session: &Session) -> Result<(), CliError> {
    let resolution = session.resolve(cli)?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("{}", resolution.path.display());
            if cli.verbose {
                for attempt in &resolution.attempts {
                    println!("  {attempt}");
                }
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "resolve",
                "path": resolution.path.to_string_lossy(),
                "strategy": resolution.strategy,
                "exists": resolution.path.is_dir(),
                "attempts": serde_json::to_value(&resolution.attempts)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// scan
// ---------------------------------------------------------------------------

fn run_scan(cli: &Cli, session: &Session, args: &ScanArgs) -> Result<(), CliError> {
    let root = session.repository(cli, args.path.as_deref())?;
    let report = scan_repository(session, &root)?;

    match output_mode(cli) {
        OutputMode::Human => print_scan_report(cli, &root, &report),
        OutputMode::Json => {
            let payload = json!({
                "command": "scan",
                "root": root.to_string_lossy(),
                "files_checked": report.files_checked,
                "files_skipped": report.files_skipped,
                "worker_count": report.worker_count,
                "elapsed_seconds": report.duration.as_secs_f64(),
                "artifacts": serde_json::to_value(&report.artifacts)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn scan_repository(session: &Session, root: &Path) -> Result<ScanReport, CliError> {
    let mut engine = ScanEngine::new(&session.config.scanner);
    if let Some(handle) = session.handle() {
        engine = engine.with_logger(handle);
    }
    let mut report = engine.scan_with_report(root)?;
    report
        .artifacts
        .sort_by(|a, b| (&a.folder, &a.base_name).cmp(&(&b.folder, &b.base_name)));
    Ok(report)
}

fn print_scan_report(cli: &Cli, root: &Path, report: &ScanReport) {
    if !cli.quiet {
        println!(
            "Scanned {} files under {} in {:.1}s ({} workers).",
            report.files_checked,
            root.display(),
            report.duration.as_secs_f64(),
            report.worker_count,
        );
        if report.files_skipped > 0 {
            println!("  {} unreadable files skipped.", report.files_skipped);
        }
    }

    if report.artifacts.is_empty() {
        if !cli.quiet {
            println!("{}", "No corrupted artifacts found.".green());
        }
        return;
    }

    if !cli.quiet {
        println!(
            "\n{}",
            format!("{} corrupted artifacts:", report.artifacts.len()).bold()
        );
    }
    for (i, artifact) in report.artifacts.iter().enumerate() {
        let shown = artifact
            .folder
            .strip_prefix(root)
            .unwrap_or(&artifact.folder)
            .join(&artifact.base_name);
        println!(
            "  {:>3}. {:<60} {}",
            i + 1,
            truncate_path(&shown, 60),
            artifact.reason.to_string().red(),
        );
    }
}

// ---------------------------------------------------------------------------
// clean
// ---------------------------------------------------------------------------

fn run_clean(cli: &Cli, session: &Session, args: &CleanArgs) -> Result<(), CliError> {
    let mode = output_mode(cli);

    let (root, items) = match &args.from {
        Some(file) => {
            let list = read_item_list(file)?;
            // A scan payload carries the root it was taken from; PATH overrides it.
            let root = match (args.path.as_deref(), list.root) {
                (Some(path), _) => path.to_path_buf(),
                (None, Some(root)) => root,
                (None, None) => session.repository(cli, None)?,
            };
            (root, list.items)
        }
        None => {
            let root = session.repository(cli, args.path.as_deref())?;
            let report = scan_repository(session, &root)?;
            if mode == OutputMode::Human {
                print_scan_report(cli, &root, &report);
            }
            let items = report.artifacts.iter().map(ArtifactLocation::from).collect();
            (root, items)
        }
    };

    if items.is_empty() {
        match mode {
            OutputMode::Human => {
                if !cli.quiet {
                    println!("Nothing to clean.");
                }
            }
            OutputMode::Json => {
                emit_clean_report_json(&root, 0, &CleanupReport::default())?;
            }
        }
        return Ok(());
    }

    let interactive = io::stdin().is_terminal() && io::stdout().is_terminal();
    if !args.yes && interactive && !confirm(&format!("Delete {} artifacts?", items.len()))? {
        if mode == OutputMode::Human {
            println!("Aborted; nothing deleted.");
        }
        return Ok(());
    }

    let options =
        CleanupOptions::from_config(&session.config.scanner, &session.config.cleanup, Some(root.clone()));
    let report = CleanupExecutor::new(options, session.handle()).clean_with_report(&items);

    match mode {
        OutputMode::Human => print_clean_summary(cli, &report),
        OutputMode::Json => emit_clean_report_json(&root, items.len(), &report)?,
    }

    if report.failures.is_empty() {
        Ok(())
    } else {
        Err(CliError::Partial(format!(
            "{} of {} items could not be cleaned",
            report.failures.len(),
            items.len() - report.duplicates_skipped,
        )))
    }
}

/// Items read with `--from`, plus the scan root when the file is a scan payload.
#[derive(Debug, PartialEq, Eq)]
struct ItemList {
    root: Option<PathBuf>,
    items: Vec<ArtifactLocation>,
}

/// Items from a `scan --json` payload or a bare JSON array.
fn read_item_list(file: &Path) -> Result<ItemList, CliError> {
    let raw = fs::read_to_string(file)
        .map_err(|e| CliError::User(format!("cannot read {}: {e}", file.display())))?;
    parse_item_list(&raw).map_err(|e| CliError::User(format!("{}: {e}", file.display())))
}

fn parse_item_list(raw: &str) -> Result<ItemList, String> {
    let value: Value = serde_json::from_str(raw).map_err(|e| format!("not valid JSON: {e}"))?;
    let (root, list) = match value {
        Value::Array(_) => (None, value),
        Value::Object(mut map) => {
            let root = match map.remove("root") {
                None | Some(Value::Null) => None,
                Some(Value::String(root)) if !root.is_empty() => Some(PathBuf::from(root)),
                Some(_) => return Err("\"root\" must be a non-empty string".to_string()),
            };
            let list = map
                .remove("artifacts")
                .ok_or_else(|| "expected an \"artifacts\" array".to_string())?;
            (root, list)
        }
        _ => return Err("expected a JSON array or a scan payload".to_string()),
    };
    let items = serde_json::from_value(list).map_err(|e| format!("malformed item list: {e}"))?;
    Ok(ItemList { root, items })
}

fn confirm(question: &str) -> Result<bool, CliError> {
    eprint!("{question} [y/N] ");
    io::stderr().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

fn print_clean_summary(cli: &Cli, report: &CleanupReport) {
    if !cli.quiet {
        println!("Cleanup complete:");
        println!(
            "  Deleted: {} artifacts ({} companion files) in {:.1}s",
            report.deleted.len(),
            report.companions_removed,
            report.duration.as_secs_f64(),
        );
        if report.duplicates_skipped > 0 {
            println!("  Duplicates ignored: {}", report.duplicates_skipped);
        }
    }
    if !report.failures.is_empty() {
        println!("  {}: {} items", "Failed".red(), report.failures.len());
        for failure in &report.failures {
            eprintln!("    {failure}");
        }
    }
}

fn emit_clean_report_json(root: &Path, requested: usize, report: &CleanupReport) -> Result<(), CliError> {
    let result = report.result();
    let payload = json!({
        "command": "clean",
        "root": root.to_string_lossy(),
        "requested": requested,
        "deleted_count": result.deleted_count,
        "errors": result.errors,
        "companions_removed": report.companions_removed,
        "duplicates_skipped": report.duplicates_skipped,
        "duration_seconds": report.duration.as_secs_f64(),
    });
    write_json_line(&payload)
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", config.to_toml()?);
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "hash": config.stable_hash()?,
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// output helpers
// ---------------------------------------------------------------------------

fn truncate_path(path: &Path, max_len: usize) -> String {
    let s = path.to_string_lossy();
    let count = s.chars().count();
    if count <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(count - (max_len - 3)).collect();
        format!("...{tail}")
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("MCD_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
