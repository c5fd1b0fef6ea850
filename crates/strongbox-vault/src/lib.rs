// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encryption and key-management core of the Strongbox credential vault.
//!
//! A vault is one key file plus the record files it protects:
//! - [`KeyStore`] owns the key file, reading both the legacy raw-key format
//!   and the structured JSON format, and regenerating key material when the
//!   file is absent or unreadable.
//! - [`CipherEngine`] seals and opens blobs with the algorithm recorded in
//!   the key material (Fernet, AES-256-GCM, or ChaCha20-Poly1305).
//! - [`RecordCodec`] encrypts a whole record collection as one blob.
//! - [`RotationManager`] re-keys every collection with a staged, journaled
//!   commit.
//! - [`Vault`] ties these together for callers.

pub mod cipher;
pub mod codec;
mod fs;
pub mod key_material;
pub mod keystore;
pub mod rotation;
pub mod transfer;
pub mod vault;

pub use cipher::{Cipher, CipherEngine};
pub use codec::{DecryptPolicy, RecordCodec};
pub use key_material::KeyMaterial;
pub use keystore::KeyStore;
pub use rotation::{CollectionFile, RecoveryOutcome, RotationManager};
pub use transfer::{export_records, read_import, EXPORT_FORMAT};
pub use vault::Vault;
