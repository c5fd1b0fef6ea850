// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongbox status` command implementation.
//!
//! Reports the algorithm in use, the key file's age against the rotation
//! policy, and how many records each collection holds.

use std::io::IsTerminal;
use std::time::Duration;

use serde::Serialize;
use strongbox_config::EncryptionConfig;
use strongbox_core::{StrongboxError, DECRYPTION_ERROR_PLACEHOLDER};
use strongbox_vault::Vault;
use tracing::warn;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub storage_location: String,
    pub algorithm: String,
    pub configured_algorithm: String,
    pub key_age_days: Option<u64>,
    pub rotation_policy_days: u32,
    pub rotation_due: bool,
    /// `None` when the collection could not be opened.
    pub passwords: Option<usize>,
    /// Password values that could not be decrypted.
    pub unreadable_passwords: usize,
    /// `None` when the collection could not be opened.
    pub notes: Option<usize>,
}

/// Format a key age in whole days.
fn format_age(age: Option<Duration>) -> String {
    match age.map(|a| a.as_secs() / 86400) {
        None => "unknown".to_string(),
        Some(0) => "less than a day".to_string(),
        Some(1) => "1 day".to_string(),
        Some(days) => format!("{days} days"),
    }
}

/// Collect the report. A collection that cannot be opened is reported as
/// unavailable so the key details are still shown.
fn build_report(vault: &Vault, encryption: &EncryptionConfig) -> StatusReport {
    let passwords = vault
        .passwords()
        .inspect_err(|e| warn!(error = %e, "password collection could not be opened"))
        .ok();
    let notes = vault
        .notes()
        .inspect_err(|e| warn!(error = %e, "note collection could not be opened"))
        .ok();
    StatusReport {
        storage_location: vault.config().storage_location.display().to_string(),
        algorithm: vault.algorithm().to_string(),
        configured_algorithm: encryption.algorithm.to_string(),
        key_age_days: vault.key_store().age().map(|a| a.as_secs() / 86400),
        rotation_policy_days: encryption.key_rotation_days,
        rotation_due: vault.rotation_due(encryption.key_rotation_days),
        passwords: passwords.as_ref().map(Vec::len),
        unreadable_passwords: passwords
            .iter()
            .flatten()
            .filter(|p| p.value == DECRYPTION_ERROR_PLACEHOLDER)
            .count(),
        notes: notes.as_ref().map(Vec::len),
    }
}

fn format_count(count: Option<usize>) -> String {
    match count {
        Some(n) => n.to_string(),
        None => "unavailable (cannot decrypt, see log)".to_string(),
    }
}

/// Run the `strongbox status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting. Colors are
/// used only when stdout is a terminal.
pub fn run_status(vault: &Vault, encryption: &EncryptionConfig, json: bool) -> Result<(), StrongboxError> {
    let report = build_report(vault, encryption);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let use_color = std::io::stdout().is_terminal();
    println!();
    println!("  strongbox status");
    println!("  {}", "-".repeat(35));
    println!("    Storage:   {}", report.storage_location);
    if report.algorithm == report.configured_algorithm {
        println!("    Algorithm: {}", report.algorithm);
    } else {
        println!(
            "    Algorithm: {} (configured {}, run change-algorithm to switch)",
            report.algorithm, report.configured_algorithm
        );
    }
    println!("    Key age:   {}", format_age(vault.key_store().age()));
    print_rotation(&report, use_color);
    println!("    Passwords: {}", format_count(report.passwords));
    if report.unreadable_passwords > 0 {
        println!("               {} could not be decrypted", report.unreadable_passwords);
    }
    println!("    Notes:     {}", format_count(report.notes));
    println!();
    Ok(())
}

fn print_rotation(report: &StatusReport, use_color: bool) {
    if report.rotation_policy_days == 0 {
        println!("    Rotation:  disabled");
        return;
    }
    match (report.rotation_due, use_color) {
        (true, true) => {
            use colored::Colorize;
            println!(
                "    Rotation:  {} older than {} days, run rotate-key",
                "due".yellow(),
                report.rotation_policy_days
            );
        }
        (true, false) => println!(
            "    Rotation:  [DUE] older than {} days, run rotate-key",
            report.rotation_policy_days
        ),
        (false, _) => println!("    Rotation:  every {} days", report.rotation_policy_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_config::VaultConfig;
    use strongbox_core::{Algorithm, PasswordEntry};

    #[test]
    fn format_age_in_days() {
        assert_eq!(format_age(None), "unknown");
        assert_eq!(format_age(Some(Duration::from_secs(60))), "less than a day");
        assert_eq!(format_age(Some(Duration::from_secs(86400))), "1 day");
        assert_eq!(format_age(Some(Duration::from_secs(86400 * 91))), "91 days");
    }

    #[test]
    fn report_counts_records_and_flags_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let created = EncryptionConfig {
            algorithm: Algorithm::ChaCha20,
            ..EncryptionConfig::default()
        };
        let vault = Vault::open(&VaultConfig::in_dir(dir.path()), &created).unwrap();
        vault
            .add_record(PasswordEntry::new("pw", "example.com", "alice"))
            .unwrap();

        let configured = EncryptionConfig::default();
        let report = build_report(&vault, &configured);
        assert_eq!(report.algorithm, "chacha20");
        assert_eq!(report.configured_algorithm, "fernet");
        assert_eq!(report.passwords, Some(1));
        assert_eq!(report.unreadable_passwords, 0);
        assert_eq!(report.notes, Some(0));
        assert!(!report.rotation_due);
    }

    #[test]
    fn undecryptable_notes_do_not_hide_key_details() {
        let dir = tempfile::tempdir().unwrap();
        let encryption = EncryptionConfig {
            algorithm: Algorithm::AesGcm,
            ..EncryptionConfig::default()
        };
        let vault = Vault::open(&VaultConfig::in_dir(dir.path()), &encryption).unwrap();
        std::fs::write(dir.path().join("secure_notes.json"), b"not sealed by this key").unwrap();

        let report = build_report(&vault, &encryption);
        assert_eq!(report.algorithm, "aes-gcm");
        assert_eq!(report.passwords, Some(0));
        assert_eq!(report.notes, None);
        assert_eq!(format_count(report.notes), "unavailable (cannot decrypt, see log)");
        run_status(&vault, &encryption, true).unwrap();
    }
}
