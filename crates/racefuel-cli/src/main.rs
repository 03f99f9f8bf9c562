//! Racefuel CLI - Main entry point

use clap::Parser;
use racefuel_cli::commands::{self, inspect::InspectOptions};
use racefuel_cli::{Cli, Commands};
use racefuel_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

fn main() {
    let cli = Cli::parse();

    // stdout carries command output; logs go to stderr
    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .console_stderr(true)
        .log_file_prefix("racefuel-cli")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().overlay_env().unwrap_or(log_config);

    // The CLI works without logging
    let _log_guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli) {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn execute_command(cli: &Cli) -> racefuel_cli::Result<()> {
    match &cli.command {
        Commands::Inspect {
            file,
            json,
            noise_threshold,
            points,
        } => commands::inspect::run(
            file,
            InspectOptions {
                noise_threshold_m: *noise_threshold,
                include_points: *points,
            },
            *json,
        ),

        Commands::Hash { file } => commands::hash::run(file),
    }
}
