// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # rbmarshal CLI
//!
//! Command-line tool for Ruby Marshal 4.8 data files.
//!
//! ## Usage
//!
//! ```sh
//! # Print the JSON projection of a file
//! rbmarshal json Data/Actors.rvdata2 --pretty
//!
//! # Show table sizes and the symbol table
//! rbmarshal inspect Data/System.rvdata2
//!
//! # Decode every data file in a directory
//! rbmarshal scan Data --ext rvdata2
//! ```

mod cmd;
mod common;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use cmd::{InspectCmd, JsonCmd, ScanCmd};
use common::{load_config, Result};
use tracing_subscriber::EnvFilter;

/// rbmarshal - Ruby Marshal data toolkit
///
/// Decode marshal 4.8 files, inspect their tables, and render them as JSON.
#[derive(Parser, Clone)]
#[command(name = "rbmarshal")]
#[command(about = "Decode Ruby Marshal 4.8 files and project them to JSON", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "ArcheBase")]
struct Cli {
    /// TOML file with optional [decoder] and [projection] tables
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log decoder activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Decode a file and print its JSON projection
    Json(JsonCmd),

    /// Show root kind, table sizes and the symbol table
    Inspect(InspectCmd),

    /// Decode every matching file in a directory
    Scan(ScanCmd),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Json(cmd) => cmd.run(&config),
        Commands::Inspect(cmd) => cmd.run(&config),
        Commands::Scan(cmd) => cmd.run(&config),
    }
}

fn main() {
    let result = run();

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
