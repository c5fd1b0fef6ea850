// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strongbox credential vault.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type used across all Strongbox crates.
#[derive(Debug, Error)]
pub enum StrongboxError {
    /// Configuration errors (invalid values, unusable paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// The key file exists but could not be read.
    ///
    /// Recovered inside the key store by regenerating key material.
    #[error("key file {} is unreadable: {source}", path.display())]
    KeyFileUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The key file parses neither as a legacy raw key nor as structured JSON.
    ///
    /// Recovered inside the key store by regenerating key material.
    #[error("key file {} is corrupt: {reason}", path.display())]
    KeyFileCorrupt { path: PathBuf, reason: String },

    /// Ciphertext failed authentication: wrong key, tampering, or truncation.
    #[error("cannot decrypt: {0}")]
    Authentication(String),

    /// An algorithm tag outside the supported set was requested.
    #[error("unsupported encryption algorithm `{0}` (expected fernet, aes-gcm, or chacha20)")]
    UnsupportedAlgorithm(String),

    /// A rotation passed its commit point but could not finish replacing files.
    ///
    /// Requires operator attention; the rotation journal is left in place so the
    /// next open can roll it forward.
    #[error("key rotation partially applied, manual intervention required: {message}")]
    PartialRotationFailure { message: String },

    /// A record file could not be read or written.
    #[error("record file {} failed: {source}", path.display())]
    RecordFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key setup or random number generation failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Other I/O failures (directory creation, journal handling).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StrongboxError {
    /// Whether this error is an authentication failure on ciphertext.
    pub fn is_authentication(&self) -> bool {
        matches!(self, StrongboxError::Authentication(_))
    }
}
