// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Strongbox configuration system.

use std::path::PathBuf;

use strongbox_config::diagnostic::ConfigError;
use strongbox_config::{load_and_validate_path, load_and_validate_str, load_config_from_str};
use strongbox_core::Algorithm;

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_strongbox_config() {
    let toml = r#"
[vault]
storage_location = "/tmp/strongbox"
key_file = "master.key"
passwords_file = "pw.bin"
notes_file = "notes.bin"

[encryption]
algorithm = "chacha20"
key_rotation_days = 30

[log]
level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.vault.storage_location, PathBuf::from("/tmp/strongbox"));
    assert_eq!(config.vault.key_file, "master.key");
    assert_eq!(config.vault.passwords_file, "pw.bin");
    assert_eq!(config.vault.notes_file, "notes.bin");
    assert_eq!(config.encryption.algorithm, Algorithm::ChaCha20);
    assert_eq!(config.encryption.key_rotation_days, 30);
    assert_eq!(config.log.level, "debug");
}

/// An empty document yields the defaults.
#[test]
fn empty_toml_uses_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.encryption.algorithm, Algorithm::Fernet);
    assert_eq!(config.vault.key_file, "encryption_key.key");
}

/// Unknown field in [vault] is reported with a suggestion and a source span.
#[test]
fn unknown_field_in_vault_suggests_correction() {
    let toml = r#"
[vault]
storage_locaton = "/tmp"
"#;

    let errors = load_and_validate_str(toml).expect_err("should reject unknown field");
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        ConfigError::UnknownKey {
            key,
            suggestion,
            span,
            ..
        } => {
            assert_eq!(key, "storage_locaton");
            assert_eq!(suggestion.as_deref(), Some("storage_location"));
            assert!(span.is_some());
        }
        other => panic!("expected UnknownKey, got {other:?}"),
    }
}

/// Algorithm tags outside the closed set are rejected before any vault I/O.
#[test]
fn unsupported_algorithm_is_rejected() {
    let toml = r#"
[encryption]
algorithm = "blowfish"
"#;

    let errors = load_and_validate_str(toml).expect_err("unknown algorithm must fail");
    match &errors[0] {
        ConfigError::InvalidValue { key, detail, expected } => {
            assert_eq!(key, "encryption.algorithm");
            assert!(detail.contains("blowfish"));
            assert!(expected.contains("aes-gcm"));
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

/// Wrong value type is reported as an invalid value.
#[test]
fn wrong_type_for_rotation_days() {
    let toml = r#"
[encryption]
key_rotation_days = "monthly"
"#;

    let errors = load_and_validate_str(toml).expect_err("string is not a u32");
    assert!(matches!(errors[0], ConfigError::InvalidValue { .. }));
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_rejects_colliding_file_names() {
    let toml = r#"
[vault]
passwords_file = "vault.json"
notes_file = "vault.json"
"#;

    let errors = load_and_validate_str(toml).expect_err("duplicate names must fail");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("must differ")))
    );
}

/// Explicit config path is honored.
#[test]
fn explicit_path_is_loaded() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(
            "custom.toml",
            r#"
[encryption]
algorithm = "aes-gcm"
"#,
        )?;
        let path = jail.directory().join("custom.toml");
        let config = load_and_validate_path(&path).expect("custom config should load");
        assert_eq!(config.encryption.algorithm, Algorithm::AesGcm);
        Ok(())
    });
}
