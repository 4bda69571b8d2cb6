//! CLI command implementations
//!
//! Every command loads the configuration, applies its log level, opens
//! the configured backend and runs one operation against a `ChunkStore`.
//! Results are written to the given output as JSON. Log lines go to
//! stderr so that stdout carries nothing but the result.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use crate::chunk::{ChunkStore, ShapeReport};
use crate::config::ChunkStoreConfig;
use crate::observability::{
    error_event, log_event_with_fields, warn_event, Event, LogTarget, Logger,
};

use super::args::Command;
use super::errors::{CliError, CliResult};

/// Outcome of a directory migration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub files: usize,
    pub migrated: usize,
    pub chunked: usize,
    pub failed: usize,
}

/// Parse arguments and run the command on a fresh runtime
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    Logger::set_target(LogTarget::Stderr);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::runtime_error(e.to_string()))?;
    runtime.block_on(run_command(cli.command, &mut io::stdout()))
}

/// Run the appropriate command based on CLI args, writing its result to `out`
pub async fn run_command<W: Write>(cmd: Command, out: &mut W) -> CliResult<()> {
    let config = load_config(cmd.config_path())?;
    if cmd.writes() && config.backend.is_volatile() {
        warn_event(
            Event::VolatileBackend,
            &[
                ("backend", config.backend.kind()),
                ("config", &cmd.config_path().display().to_string()),
            ],
        );
    }
    let store = ChunkStore::open(&config).await?;

    match cmd {
        Command::Put { key, file, .. } => put(&store, &key, &file, out).await,
        Command::Get { key, .. } => get(&store, &key, out).await,
        Command::Inspect { key, .. } => inspect(&store, &key, out).await,
        Command::Migrate { dir, .. } => {
            let summary = migrate(&store, &dir).await?;
            write_json(out, &summary)
        }
    }
}

/// Load configuration and apply its log level
pub fn load_config(config_path: &Path) -> CliResult<ChunkStoreConfig> {
    let config = ChunkStoreConfig::load(config_path)?;
    Logger::set_min_severity(config.severity()?);

    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("backend", config.backend.kind()),
            ("path", &config_path.display().to_string()),
        ],
    );
    Ok(config)
}

/// Store one JSON file and print the outcome
pub async fn put<W: Write>(store: &ChunkStore, key: &str, file: &Path, out: &mut W) -> CliResult<()> {
    let document = read_document(file)?;
    let outcome = store.store(key, &document).await?;
    write_json(out, &outcome)
}

/// Print the reassembled document
pub async fn get<W: Write>(store: &ChunkStore, key: &str, out: &mut W) -> CliResult<()> {
    let document = store.load(key).await.ok_or_else(|| CliError::not_found(key))?;
    write_json(out, &document)
}

/// Print how the key is laid out on the backend
pub async fn inspect<W: Write>(store: &ChunkStore, key: &str, out: &mut W) -> CliResult<()> {
    let summary = store
        .inspect(key)
        .await
        .ok_or_else(|| CliError::not_found(key))?;
    write_json(out, &summary)
}

/// Store every `*.json` file in `dir` under its file stem, in name order.
///
/// A file that cannot be read, parsed or stored is counted as failed and
/// the migration moves on.
pub async fn migrate(store: &ChunkStore, dir: &Path) -> CliResult<MigrationSummary> {
    let files = json_files(dir)?;
    let mut summary = MigrationSummary {
        files: files.len(),
        ..MigrationSummary::default()
    };

    log_event_with_fields(
        Event::MigrateBegin,
        &[
            ("dir", &dir.display().to_string()),
            ("files", &files.len().to_string()),
        ],
    );

    for path in &files {
        let name = path.display().to_string();
        let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
            summary.failed += 1;
            error_event(
                Event::MigrateFileFailed,
                &[("error", "file name is not valid UTF-8"), ("file", &name)],
            );
            continue;
        };

        let result = match read_document(path) {
            Ok(document) => {
                let shape = ShapeReport::of(&document);
                log_event_with_fields(
                    Event::MigrateFile,
                    &[
                        ("entries", &shape.entries.to_string()),
                        ("file", &name),
                        ("key", key),
                        ("kind", shape.kind),
                        ("size", &shape.size.to_string()),
                    ],
                );
                store.store(key, &document).await.map_err(CliError::from)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome) => {
                summary.migrated += 1;
                if outcome.chunked {
                    summary.chunked += 1;
                }
            }
            Err(e) => {
                summary.failed += 1;
                error_event(
                    Event::MigrateFileFailed,
                    &[("error", &e.to_string()), ("file", &name), ("key", key)],
                );
            }
        }
    }

    log_event_with_fields(
        Event::MigrateComplete,
        &[
            ("chunked", &summary.chunked.to_string()),
            ("failed", &summary.failed.to_string()),
            ("migrated", &summary.migrated.to_string()),
        ],
    );
    Ok(summary)
}

/// `*.json` files directly inside `dir`, sorted by name
fn json_files(dir: &Path) -> CliResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", dir.display(), e)))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_document(path: &Path) -> CliResult<Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content)
        .map_err(|e| CliError::invalid_document(format!("{}: {}", path.display(), e)))
}

fn write_json<W: Write, T: Serialize>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
