use std::error::Error;
use std::process::ExitCode;

use chrono::Local;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use shepherd::cli::parse_args;
use shepherd::config::load_config;
use shepherd::error::OrchestratorError;
use shepherd::scheduler;

fn main() -> ExitCode {
    let args = parse_args();

    if let Err(err) = init_logging(args.log.as_deref()) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    if let Err(err) = run(args) {
        error!(%err, "shepherd exited with an error");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn init_logging(log_path: Option<&std::path::Path>) -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .init();
        }
    }
    Ok(())
}

fn run(args: shepherd::cli::Cli) -> Result<(), OrchestratorError> {
    if !args.run_dir.is_dir() {
        return Err(OrchestratorError::RunDirNotFound(
            args.run_dir.display().to_string(),
        ));
    }

    let working_dir = match &args.work_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|source| OrchestratorError::CreateDirError {
            path: ".".to_string(),
            source,
        })?,
    };
    if !working_dir.is_dir() {
        return Err(OrchestratorError::WorkDirNotFound(
            working_dir.display().to_string(),
        ));
    }

    let start_time_fmt = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    info!(start_time = %start_time_fmt, run_dir = %args.run_dir.display(), "starting shepherd");

    let config = load_config(&args.config)?;

    scheduler::run(config, args.run_dir.clone(), working_dir)?;

    info!("shepherd run complete");
    Ok(())
}
