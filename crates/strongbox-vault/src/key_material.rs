// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key material and its on-disk document form.

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use ring::digest::{digest, SHA256};
use secrecy::{ExposeSecret, SecretSlice};
use serde::{Deserialize, Serialize};
use strongbox_core::{Algorithm, StrongboxError};
use zeroize::Zeroizing;

use crate::cipher::random_array;

/// Salt length recorded for nonce-based algorithms.
pub const SALT_LEN: usize = 16;

/// Nonce seed length recorded for nonce-based algorithms.
pub const NONCE_SEED_LEN: usize = 12;

/// A key plus the algorithm it belongs to.
///
/// The salt and nonce seed are generated and persisted for nonce-based
/// algorithms but never used for encryption: every seal draws a fresh nonce.
pub struct KeyMaterial {
    algorithm: Algorithm,
    key: SecretSlice<u8>,
    salt: Option<[u8; SALT_LEN]>,
    nonce_seed: Option<[u8; NONCE_SEED_LEN]>,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm)
            .field("key", &"[REDACTED]")
            .field("has_salt", &self.salt.is_some())
            .finish()
    }
}

impl KeyMaterial {
    /// Build key material, checking the key fits the algorithm.
    pub fn new(
        algorithm: Algorithm,
        key: Vec<u8>,
        salt: Option<[u8; SALT_LEN]>,
        nonce_seed: Option<[u8; NONCE_SEED_LEN]>,
    ) -> Result<Self, StrongboxError> {
        let key = Zeroizing::new(key);
        if key.len() != algorithm.key_len() {
            return Err(StrongboxError::Crypto(format!(
                "{algorithm} key must be {} bytes, got {}",
                algorithm.key_len(),
                key.len()
            )));
        }
        if algorithm == Algorithm::Fernet {
            let valid = std::str::from_utf8(&key)
                .ok()
                .and_then(fernet::Fernet::new)
                .is_some();
            if !valid {
                return Err(StrongboxError::Crypto(
                    "fernet key is not a url-safe base64 32-byte key".to_string(),
                ));
            }
        }
        Ok(Self {
            algorithm,
            key: SecretSlice::from(key.to_vec()),
            salt,
            nonce_seed,
        })
    }

    /// Fresh random key material for `algorithm` from the system CSPRNG.
    pub fn generate(algorithm: Algorithm) -> Result<Self, StrongboxError> {
        let raw = Zeroizing::new(random_array::<32>()?);
        match algorithm {
            Algorithm::Fernet => {
                let token = Zeroizing::new(URL_SAFE.encode(raw.as_slice()));
                Self::new(algorithm, token.as_bytes().to_vec(), None, None)
            }
            Algorithm::AesGcm | Algorithm::ChaCha20 => Self::new(
                algorithm,
                raw.to_vec(),
                Some(random_array::<SALT_LEN>()?),
                Some(random_array::<NONCE_SEED_LEN>()?),
            ),
        }
    }

    /// Interpret a legacy key file (a raw key with no JSON wrapper).
    ///
    /// A valid Fernet token is used as-is. Anything else is hashed with
    /// SHA-256 into a Fernet key so existing files stay usable. Returns
    /// `None` for empty content.
    pub fn from_legacy_raw(raw: &[u8]) -> Option<Self> {
        let trimmed = raw.trim_ascii();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(token) = std::str::from_utf8(trimmed)
            && fernet::Fernet::new(token).is_some()
        {
            return Self::new(Algorithm::Fernet, trimmed.to_vec(), None, None).ok();
        }
        let derived = digest(&SHA256, trimmed);
        let token = Zeroizing::new(URL_SAFE.encode(derived.as_ref()));
        Self::new(Algorithm::Fernet, token.as_bytes().to_vec(), None, None).ok()
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn key_bytes(&self) -> &[u8] {
        self.key.expose_secret()
    }

    pub fn salt(&self) -> Option<&[u8; SALT_LEN]> {
        self.salt.as_ref()
    }

    pub fn nonce_seed(&self) -> Option<&[u8; NONCE_SEED_LEN]> {
        self.nonce_seed.as_ref()
    }

    pub(crate) fn to_document(&self) -> KeyFileDoc {
        KeyFileDoc {
            key: STANDARD.encode(self.key_bytes()),
            algorithm: self.algorithm.to_string(),
            salt: self.salt.map(|s| STANDARD.encode(s)),
            nonce: self.nonce_seed.map(|n| STANDARD.encode(n)),
        }
    }

    /// Rebuild key material from a parsed key document.
    ///
    /// The error is a human-readable reason the document is unusable.
    pub(crate) fn from_document(doc: &KeyFileDoc) -> Result<Self, String> {
        let algorithm = Algorithm::parse(&doc.algorithm).map_err(|e| e.to_string())?;
        let key = STANDARD
            .decode(doc.key.trim())
            .map_err(|e| format!("key is not valid base64: {e}"))?;
        let salt = decode_fixed::<SALT_LEN>("salt", doc.salt.as_deref())?;
        let nonce_seed = decode_fixed::<NONCE_SEED_LEN>("nonce", doc.nonce.as_deref())?;
        Self::new(algorithm, key, salt, nonce_seed).map_err(|e| e.to_string())
    }
}

fn decode_fixed<const N: usize>(field: &str, value: Option<&str>) -> Result<Option<[u8; N]>, String> {
    let Some(value) = value else {
        return Ok(None);
    };
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|e| format!("{field} is not valid base64: {e}"))?;
    let len = bytes.len();
    let array: [u8; N] = bytes
        .try_into()
        .map_err(|_| format!("{field} must be {N} bytes, got {len}"))?;
    Ok(Some(array))
}

/// Structured key file: standard base64 fields plus the algorithm tag.
#[derive(Serialize, Deserialize)]
pub(crate) struct KeyFileDoc {
    pub key: String,
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl std::fmt::Debug for KeyFileDoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFileDoc")
            .field("key", &"[REDACTED]")
            .field("algorithm", &self.algorithm)
            .field("has_salt", &self.salt.is_some())
            .finish()
    }
}
