//! CLI argument definitions using clap
//!
//! Commands:
//! - chronodb inspect <file>
//! - chronodb mods <file>
//! - chronodb recover --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chronodb - a strict, crash-safe time-series storage engine core
#[derive(Parser, Debug)]
#[command(name = "chronodb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the chunk layout and time ranges of a data file
    Inspect {
        /// Path to the data file
        file: PathBuf,
    },

    /// List the deletion records of a data file's modification log
    Mods {
        /// Path to the data file
        file: PathBuf,
    },

    /// Recover every unsealed file under the configured data directory
    Recover {
        /// Path to configuration file
        #[arg(long, default_value = "./chronodb.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
