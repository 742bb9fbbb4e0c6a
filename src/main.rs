#[macro_use]
extern crate tracing;

use anyhow::{Context, Result as AnyResult};
use clap::Parser;
use configs::{Cli, DoctorConfig};
use doctor::Doctor;
use report::Report;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod certificate_interceptor;
mod components;
mod configs;
mod doctor;
mod error;
mod report;
mod truststore;
mod types;

#[cfg(test)]
mod test_support;

/// Every check passed.
const EXIT_OK: u8 = 0;
/// The run could not complete.
const EXIT_FATAL: u8 = 1;
/// The run completed but at least one check failed.
const EXIT_CHECK_FAILED: u8 = 2;

fn main() -> ExitCode {
    // Load environment variables from the `.env` file
    dotenvy::dotenv().ok();
    // Initialize the logger after loading the environment variables.
    // Logs go to stderr; stdout carries the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(true) => ExitCode::from(EXIT_OK),
        Ok(false) => ExitCode::from(EXIT_CHECK_FAILED),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

/// Returns whether every check passed.
fn run(cli: &Cli) -> AnyResult<bool> {
    let config = DoctorConfig::load(cli).context("Failed to load the configuration")?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to bootstrap the Tokio runtime")?;

    let mut report = Report::new(std::io::stdout().lock());
    runtime
        .block_on(Doctor::new(config).run(&mut report))
        .context("Diagnosis aborted")?;

    if !report.all_passed() {
        warn!("Failed checks: {}", report.failed().join(", "));
    }
    Ok(report.all_passed())
}
