#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use std::process;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "nvisy_retro_cli::startup";
pub const TRACING_TARGET_SHUTDOWN: &str = "nvisy_retro_cli::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "nvisy_retro_cli::config";

fn main() {
    let Err(error) = run() else {
        tracing::debug!(
            target: TRACING_TARGET_SHUTDOWN,
            "configuration resolved successfully"
        );
        process::exit(0);
    };

    let message = format!("{error:#}");
    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %message,
            "configuration rejected"
        );
    } else {
        eprintln!("Error: {message}");
    }

    process::exit(1);
}

/// Main application entry point.
fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing()?;
    Cli::log_build_info();

    let config = cli.load()?;
    cli.log(&config);

    println!("{}", cli.render(&config)?);
    Ok(())
}
