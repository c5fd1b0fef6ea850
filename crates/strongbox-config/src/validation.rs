// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and distinct vault file names.

use crate::diagnostic::ConfigError;
use crate::model::StrongboxConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &StrongboxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.vault.storage_location.as_os_str().is_empty() {
        errors.push(ConfigError::Validation {
            message: "vault.storage_location must not be empty".to_string(),
        });
    }

    let files = [
        ("vault.key_file", &config.vault.key_file),
        ("vault.passwords_file", &config.vault.passwords_file),
        ("vault.notes_file", &config.vault.notes_file),
    ];

    for (key, name) in files {
        if name.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("{key} must not be empty"),
            });
        } else if name.contains('/') || name.contains('\\') {
            errors.push(ConfigError::Validation {
                message: format!(
                    "{key} `{name}` must be a file name inside vault.storage_location, not a path"
                ),
            });
        } else if name.ends_with(".staged") || name == crate::ROTATION_JOURNAL_FILE {
            errors.push(ConfigError::Validation {
                message: format!("{key} `{name}` collides with a name reserved for key rotation"),
            });
        }
    }

    for (i, (key_a, a)) in files.iter().enumerate() {
        for (key_b, b) in &files[i + 1..] {
            if !a.trim().is_empty() && a == b {
                errors.push(ConfigError::Validation {
                    message: format!("{key_a} and {key_b} must differ, both are `{a}`"),
                });
            }
        }
    }

    if !LOG_LEVELS.contains(&config.log.level.to_lowercase().as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log.level `{}` is not one of {}",
                config.log.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
