// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Strongbox credential vault.
//!
//! This crate provides the error type, the closed set of supported
//! encryption algorithms, and the record types persisted by the vault.
//! It performs no I/O and holds no key material.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::StrongboxError;
pub use types::{
    Algorithm, PasswordEntry, RecordKind, SecureNote, VaultRecord, DECRYPTION_ERROR_PLACEHOLDER,
    REDACTED_MARKER,
};
