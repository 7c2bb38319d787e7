use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gifhoard::config::resolve_config;
use gifhoard::{build_scheduler, telemetry, Database};

fn main() -> ExitCode {
    let cli_path = std::env::args_os().nth(1).map(PathBuf::from);

    let config = match resolve_config(cli_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gifhoard: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = telemetry::init_logging(&config.logging) {
        eprintln!("gifhoard: {}", e);
        return ExitCode::FAILURE;
    }

    let db = match Database::open(&config.database.path) {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open store at {}: {}", config.database.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Shutdown requested");
        handler_flag.store(true, Ordering::Release);
    }) {
        tracing::error!("Failed to install Ctrl-C handler: {}", e);
        return ExitCode::FAILURE;
    }

    let scheduler = match build_scheduler(&config, db, Arc::clone(&shutdown)) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!("Failed to set up ingestion: {}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        channels = config.channels().len(),
        instances = config.transcoder.instances.len(),
        "Starting ingestion"
    );

    let handle = match scheduler.start() {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start scheduler: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if handle.join().is_err() {
        tracing::error!("Scheduler thread panicked");
        return ExitCode::FAILURE;
    }

    tracing::info!("Ingestion stopped");
    ExitCode::SUCCESS
}
