//! Command-line interface for shepherd.
use std::path::PathBuf;

use clap::Parser;

/// Runs a dependency-ordered workflow of shell services to completion.
#[derive(Debug, Parser)]
#[command(name = "shepherd", about = "A dependency-ordered workflow orchestrator for shell services.")]
pub struct Cli {
    /// Writable directory exclusive to this run. Must already exist.
    #[arg(long, value_name = "DIR")]
    pub run_dir: PathBuf,

    /// Path to the workflow config (YAML). Must already exist.
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Directory to invoke service commands from. Must already exist.
    /// Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Path to shepherd's own log file. Parent directories are created if
    /// missing. Defaults to stderr.
    #[arg(long, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

/// Parses CLI arguments from the process's `argv`.
pub fn parse_args() -> Cli {
    Cli::parse()
}
