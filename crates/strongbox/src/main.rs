// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strongbox - a local credential vault.
//!
//! This is the binary entry point for the `strongbox` command.

mod keys;
mod records;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use strongbox_config::StrongboxConfig;
use strongbox_core::{Algorithm, RecordKind, StrongboxError};
use strongbox_vault::Vault;

/// Strongbox - a local credential vault.
#[derive(Parser, Debug)]
#[command(name = "strongbox", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the vault's algorithm, key age, and record counts.
    Status {
        /// Output JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// List records without their secret values.
    List {
        /// `passwords` or `notes`.
        kind: RecordKind,
    },
    /// Generate a new key and re-encrypt every collection.
    RotateKey,
    /// Switch the vault to another algorithm with a new key.
    ChangeAlgorithm {
        /// `fernet`, `aes-gcm`, or `chacha20`.
        #[arg(value_parser = parse_algorithm)]
        algorithm: Algorithm,
    },
    /// Write a collection to a JSON file.
    Export {
        kind: RecordKind,
        path: PathBuf,
        /// Write secret values in cleartext instead of redacting them.
        #[arg(long)]
        include_secrets: bool,
    },
    /// Append records from a JSON export.
    Import { kind: RecordKind, path: PathBuf },
}

fn parse_algorithm(tag: &str) -> Result<Algorithm, String> {
    Algorithm::parse(tag).map_err(|e| e.to_string())
}

fn main() {
    let cli = Cli::parse();

    let loaded = match cli.config.as_deref() {
        Some(path) => strongbox_config::load_and_validate_path(path),
        None => strongbox_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            strongbox_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log.level);

    if let Err(e) = run(cli.command, &config) {
        eprintln!("strongbox: {e}");
        std::process::exit(1);
    }
}

fn run(command: Commands, config: &StrongboxConfig) -> Result<(), StrongboxError> {
    let mut vault = Vault::open(&config.vault, &config.encryption)?;
    match command {
        Commands::Status { json } => status::run_status(&vault, &config.encryption, json),
        Commands::List { kind } => records::run_list(&vault, kind),
        Commands::RotateKey => keys::run_rotate_key(&mut vault),
        Commands::ChangeAlgorithm { algorithm } => keys::run_change_algorithm(&mut vault, algorithm),
        Commands::Export {
            kind,
            path,
            include_secrets,
        } => records::run_export(&vault, kind, &path, include_secrets),
        Commands::Import { kind, path } => records::run_import(&vault, kind, &path),
    }
}

/// Initialize the tracing subscriber with the configured log level.
///
/// `RUST_LOG` overrides the configured level when set.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("strongbox={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}
