//! CLI module for kvchunk
//!
//! Provides command-line interface for:
//! - put: Store a JSON file
//! - get: Print a stored document
//! - inspect: Show the stored layout of a key
//! - migrate: Bulk-load a directory of JSON files

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{get, inspect, load_config, migrate, put, run, run_command, MigrationSummary};
pub use errors::{CliError, CliErrorCode, CliResult};
