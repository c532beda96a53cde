//! pbsync - copy one PocketBase instance onto another.
//!
//! A thin wrapper over `pbsync-core` and `pbsync-http`: resolves credentials,
//! renders progress and turns the outcome of a migration into an exit code.

mod cli;
mod credentials;
mod output;
mod progress;
mod prompt;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::HumanBytes;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pbsync_core::migration::{Migration, MigrationReport};
use pbsync_http::HttpBackend;

use cli::Cli;
use credentials::EnvCredentialResolver;
use progress::TerminalObserver;

/// Exit status of a second interrupt.
const FORCED_EXIT: i32 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone()));

    let backend = HttpBackend::new().context("Failed to initialize HTTP client")?;
    let resolver = EnvCredentialResolver::load(&cli.env_file, cancel.clone())?;
    let observer = TerminalObserver::new();

    let migration = Migration::new(&backend, &resolver, &observer, cli.migration_config())
        .with_cancellation(cancel);

    match migration.run().await {
        Ok(report) => {
            print_report(&report);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_cancelled() => {
            output::error(&format!("Interrupted during {}", e.stage));
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            error!(stage = %e.stage, error = %e.source, "Migration failed");
            output::error(&e.to_string());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn print_report(report: &MigrationReport) {
    if report.is_clean() {
        output::success("Migration completed");
    } else {
        output::success(&format!(
            "Migration completed with {} warning(s)",
            report.warnings.len()
        ));
        for warning in &report.warnings {
            output::warning(&warning.to_string());
        }
    }
    output::field("Backup", report.backup_name.as_str());
    output::field("Size", &HumanBytes(report.bytes).to_string());
    output::field("Health probes", &report.probes.to_string());
}

/// Cancel the run on the first Ctrl+C, exit right away on the second.
async fn watch_interrupts(cancel: CancellationToken) {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    info!("Received SIGINT (Ctrl+C), stopping");
    output::warning("Interrupted, stopping... (press Ctrl+C again to force)");
    cancel.cancel();

    if signal::ctrl_c().await.is_ok() {
        std::process::exit(FORCED_EXIT);
    }
}

fn init_logging(verbosity: u8, json: bool) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
