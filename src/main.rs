#![forbid(unsafe_code)]

//! mcd — Maven Cache Doctor CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("mcd: {e}");
        std::process::exit(e.exit_code());
    }
}
