// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Algorithm tags and the record types persisted by the vault.

use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::StrongboxError;

/// Literal written in place of a secret field by a redacted export.
pub const REDACTED_MARKER: &str = "[REDACTED]";

/// Substituted for a field value that fails field-level decryption.
pub const DECRYPTION_ERROR_PLACEHOLDER: &str = "[Decryption Error]";

/// The closed set of algorithms that can protect a vault.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
pub enum Algorithm {
    /// Fernet tokens: AES-128-CBC + HMAC-SHA256 in a self-describing envelope.
    #[default]
    #[serde(rename = "fernet")]
    #[strum(serialize = "fernet")]
    Fernet,
    /// AES-256-GCM with a random 96-bit nonce per encryption.
    #[serde(rename = "aes-gcm")]
    #[strum(serialize = "aes-gcm")]
    AesGcm,
    /// ChaCha20-Poly1305 with a random 96-bit nonce per encryption.
    #[serde(rename = "chacha20")]
    #[strum(serialize = "chacha20")]
    ChaCha20,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Fernet, Algorithm::AesGcm, Algorithm::ChaCha20];

    /// Parse a configuration or key-file tag, rejecting anything outside the set.
    pub fn parse(tag: &str) -> Result<Self, StrongboxError> {
        tag.trim()
            .parse()
            .map_err(|_| StrongboxError::UnsupportedAlgorithm(tag.to_string()))
    }

    /// Nonce-based AEADs prefix every blob with a 12-byte nonce.
    pub fn is_nonce_based(self) -> bool {
        !matches!(self, Algorithm::Fernet)
    }

    /// Raw key length in bytes as persisted in the key file.
    ///
    /// Fernet keys are persisted as their 44-character url-safe base64 token.
    pub fn key_len(self) -> usize {
        match self {
            Algorithm::Fernet => 44,
            Algorithm::AesGcm | Algorithm::ChaCha20 => 32,
        }
    }
}

/// Which record collection a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordKind {
    Passwords,
    Notes,
}

/// Behavior shared by every record type stored in a vault collection.
pub trait VaultRecord: Serialize + DeserializeOwned + Clone + std::fmt::Debug + Send + 'static {
    /// The collection this record type belongs to.
    const KIND: RecordKind;

    /// Whether the secret field is additionally encrypted inside the sealed
    /// collection blob.
    const FIELD_SEALED: bool;

    fn id(&self) -> &str;

    /// The field that export redacts and import inspects.
    fn secret(&self) -> &str;

    fn set_secret(&mut self, value: String);

    fn category(&self) -> &str;

    /// Assign a fresh id and reset timestamps to now (used on import).
    fn reissue(&mut self);

    /// Take the id and creation time of `original` (used by updates).
    fn inherit_identity(&mut self, original: &Self);

    /// Bump the modification timestamp.
    fn touch(&mut self);

    /// Case-insensitive free-text match over the searchable fields.
    fn matches(&self, query: &str) -> bool;
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn now_naive() -> NaiveDateTime {
    Local::now().naive_local()
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

fn default_category() -> String {
    "General".to_string()
}

/// A stored password with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordEntry {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub username: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "now_naive")]
    pub created: NaiveDateTime,
    #[serde(default = "now_naive")]
    pub modified: NaiveDateTime,
}

impl PasswordEntry {
    /// Create a new entry with a fresh id and current timestamps.
    pub fn new(value: impl Into<String>, website: impl Into<String>, username: impl Into<String>) -> Self {
        let now = now_naive();
        Self {
            id: new_id(),
            value: value.into(),
            website: website.into(),
            username: username.into(),
            category: default_category(),
            notes: String::new(),
            created: now,
            modified: now,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

impl VaultRecord for PasswordEntry {
    const KIND: RecordKind = RecordKind::Passwords;
    const FIELD_SEALED: bool = true;

    fn id(&self) -> &str {
        &self.id
    }

    fn secret(&self) -> &str {
        &self.value
    }

    fn set_secret(&mut self, value: String) {
        self.value = value;
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn reissue(&mut self) {
        let now = now_naive();
        self.id = new_id();
        self.created = now;
        self.modified = now;
    }

    fn inherit_identity(&mut self, original: &Self) {
        self.id.clone_from(&original.id);
        self.created = original.created;
    }

    fn touch(&mut self) {
        self.modified = now_naive();
    }

    fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.website.to_lowercase().contains(&query)
            || self.username.to_lowercase().contains(&query)
            || self.notes.to_lowercase().contains(&query)
    }
}

/// A free-form secure note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecureNote {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    /// Unix seconds.
    #[serde(default = "now_unix")]
    pub created: i64,
    /// Unix seconds.
    #[serde(default = "now_unix")]
    pub updated: i64,
}

impl SecureNote {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = now_unix();
        Self {
            id: new_id(),
            title: title.into(),
            content: content.into(),
            category: String::new(),
            created: now,
            updated: now,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

impl VaultRecord for SecureNote {
    const KIND: RecordKind = RecordKind::Notes;
    const FIELD_SEALED: bool = false;

    fn id(&self) -> &str {
        &self.id
    }

    fn secret(&self) -> &str {
        &self.content
    }

    fn set_secret(&mut self, value: String) {
        self.content = value;
    }

    fn category(&self) -> &str {
        &self.category
    }

    fn reissue(&mut self) {
        let now = now_unix();
        self.id = new_id();
        self.created = now;
        self.updated = now;
    }

    fn inherit_identity(&mut self, original: &Self) {
        self.id.clone_from(&original.id);
        self.created = original.created;
    }

    fn touch(&mut self) {
        self.updated = now_unix();
    }

    fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.title.to_lowercase().contains(&query) || self.content.to_lowercase().contains(&query)
    }
}
