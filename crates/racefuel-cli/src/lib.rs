//! Racefuel CLI Library
//!
//! Offline operator tool for GPX files destined for the race catalog.
//!
//! # Overview
//!
//! - **Inspection**: parse a local GPX the same way the server does and show
//!   the derived course statistics (`racefuel inspect`)
//! - **Fingerprinting**: print the SHA-256 stored as a catalog race's
//!   `gpxHash` (`racefuel hash`)

pub mod commands;
pub mod error;
pub mod format;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use racefuel_common::gpx::DEFAULT_ELEVATION_NOISE_THRESHOLD_M;
use std::path::PathBuf;

/// Racefuel - race fueling planner tooling
#[derive(Parser, Debug)]
#[command(name = "racefuel")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a GPX file and print its course statistics
    Inspect {
        /// Path to the GPX file
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Elevation changes at or below this many meters are ignored
        #[arg(
            long,
            env = "GPX_ELEVATION_NOISE_THRESHOLD_M",
            default_value_t = DEFAULT_ELEVATION_NOISE_THRESHOLD_M
        )]
        noise_threshold: f64,

        /// Include every track point in the output
        #[arg(long)]
        points: bool,
    },

    /// Print the SHA-256 content hash of a file
    Hash {
        /// Path to the file
        file: PathBuf,
    },
}
