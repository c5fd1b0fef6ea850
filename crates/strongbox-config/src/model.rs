// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Strongbox credential vault.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strongbox_core::{Algorithm, RecordKind};

/// Top-level Strongbox configuration.
///
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrongboxConfig {
    /// Where the key file and record files live.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Algorithm selection and rotation policy.
    #[serde(default)]
    pub encryption: EncryptionConfig,

    /// Log output settings for the command-line binary.
    #[serde(default)]
    pub log: LogConfig,
}

/// Vault file layout.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Base directory for the key file and every record file.
    #[serde(default = "default_storage_location")]
    pub storage_location: PathBuf,

    /// Key file name inside `storage_location`.
    #[serde(default = "default_key_file")]
    pub key_file: String,

    /// Password collection file name inside `storage_location`.
    #[serde(default = "default_passwords_file")]
    pub passwords_file: String,

    /// Secure note collection file name inside `storage_location`.
    #[serde(default = "default_notes_file")]
    pub notes_file: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            storage_location: default_storage_location(),
            key_file: default_key_file(),
            passwords_file: default_passwords_file(),
            notes_file: default_notes_file(),
        }
    }
}

impl VaultConfig {
    /// Vault rooted at `dir` with default file names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_location: dir.into(),
            ..Self::default()
        }
    }

    pub fn key_path(&self) -> PathBuf {
        self.storage_location.join(&self.key_file)
    }

    pub fn record_path(&self, kind: RecordKind) -> PathBuf {
        match kind {
            RecordKind::Passwords => self.storage_location.join(&self.passwords_file),
            RecordKind::Notes => self.storage_location.join(&self.notes_file),
        }
    }
}

fn default_storage_location() -> PathBuf {
    PathBuf::from("./storage")
}

fn default_key_file() -> String {
    "encryption_key.key".to_string()
}

fn default_passwords_file() -> String {
    "passwords.json".to_string()
}

fn default_notes_file() -> String {
    "secure_notes.json".to_string()
}

/// Encryption settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Algorithm used when a key file has to be created.
    ///
    /// An existing structured key file keeps the algorithm recorded in it;
    /// switching requires an explicit `change-algorithm`.
    #[serde(default)]
    pub algorithm: Algorithm,

    /// Advisory key age in days after which rotation is reported as due
    /// (0 disables the check). Never enforced by the vault itself.
    #[serde(default = "default_key_rotation_days")]
    pub key_rotation_days: u32,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            key_rotation_days: default_key_rotation_days(),
        }
    }
}

fn default_key_rotation_days() -> u32 {
    90
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
