//! CLI argument definitions using clap
//!
//! Commands:
//! - kvchunk put --key <key> --file <path>
//! - kvchunk get --key <key>
//! - kvchunk inspect --key <key>
//! - kvchunk migrate --dir <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// kvchunk - store JSON documents of any size on a size-capped key-value store
#[derive(Parser, Debug)]
#[command(name = "kvchunk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store a JSON file under a key
    ///
    /// With the default memory backend the document is gone when the
    /// process exits. Configure a file backend to keep it.
    Put {
        /// Path to configuration file
        #[arg(long, default_value = "./kvchunk.json")]
        config: PathBuf,

        /// Document key
        #[arg(long)]
        key: String,

        /// JSON file to store
        #[arg(long)]
        file: PathBuf,
    },

    /// Print the document stored under a key
    Get {
        /// Path to configuration file
        #[arg(long, default_value = "./kvchunk.json")]
        config: PathBuf,

        /// Document key
        #[arg(long)]
        key: String,
    },

    /// Show how a key is laid out on the backend
    Inspect {
        /// Path to configuration file
        #[arg(long, default_value = "./kvchunk.json")]
        config: PathBuf,

        /// Document key
        #[arg(long)]
        key: String,
    },

    /// Store every *.json file in a directory under its file stem
    ///
    /// Needs a file backend for the documents to outlive the process.
    Migrate {
        /// Path to configuration file
        #[arg(long, default_value = "./kvchunk.json")]
        config: PathBuf,

        /// Directory of JSON files
        #[arg(long)]
        dir: PathBuf,
    },
}

impl Command {
    /// Whether the command writes to the store
    pub fn writes(&self) -> bool {
        matches!(self, Command::Put { .. } | Command::Migrate { .. })
    }

    /// Configuration file named by any command
    pub fn config_path(&self) -> &PathBuf {
        match self {
            Command::Put { config, .. }
            | Command::Get { config, .. }
            | Command::Inspect { config, .. }
            | Command::Migrate { config, .. } => config,
        }
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
