//! CEMES admin CLI - a terminal client for the microcredit backend.
//!
//! Logs in against the admin API, keeps the session between runs and
//! manages loans, customers, payments and admin users.

mod cli;
mod commands;
mod navigator;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use cemes_core::auth::{MemoryStorage, StorageBackend};
use cemes_core::models::{Admin, Customer, Loan, Payment};
use cemes_core::{Config, Route};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Command};
use navigator::TerminalNavigator;

/// Log file name when `--log-file` points at a directory
const DEFAULT_LOG_FILE: &str = "cemes.log";

/// Initialize the tracing subscriber for logging.
/// The returned guard flushes the log file and must live until exit.
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let (dir, name) = if path.is_dir() {
                (path, Path::new(DEFAULT_LOG_FILE))
            } else {
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                let name = path
                    .file_name()
                    .map(Path::new)
                    .unwrap_or_else(|| Path::new(DEFAULT_LOG_FILE));
                (dir, name)
            };
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref());
    info!("CEMES CLI starting");

    let mut config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    debug!(api_base_url = %config.api_base_url(), storage = ?config.storage, "Config loaded");

    let backend: Box<dyn StorageBackend> = if cli.ephemeral {
        Box::new(MemoryStorage::new())
    } else {
        config.storage_backend()?
    };
    let manager = cemes_core::connect(&config, backend, Arc::new(TerminalNavigator))?;

    match cli.command {
        Command::Login { email, next } => {
            commands::login(&manager, &mut config, email, next).await?
        }
        Command::Logout => {
            manager.logout();
            println!("Logged out");
        }
        Command::Status => commands::status(&manager),
        Command::Visit { path } => commands::visit(&manager, &path).await?,
        Command::Summary => {
            commands::require_access(&manager, Route::Dashboard)?;
            commands::summary(&manager).await?
        }
        Command::Loans { action } => {
            commands::resource_command::<Loan>(&manager, Route::Loans, action).await?
        }
        Command::Customers { action } => {
            commands::resource_command::<Customer>(&manager, Route::Customers, action).await?
        }
        Command::Payments { action } => {
            commands::resource_command::<Payment>(&manager, Route::Payments, action).await?
        }
        Command::Admins { action } => {
            commands::resource_command::<Admin>(&manager, Route::Admin, action).await?
        }
    }

    info!("CEMES CLI finished");
    Ok(())
}
