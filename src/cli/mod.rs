//! Command-line interface
//!
//! Thin dispatch over the library: inspect a data file, list a
//! modification log, or run restart recovery over a data directory.

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::run;
pub use errors::{CliError, CliResult};
