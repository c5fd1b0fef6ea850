// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record collections sealed as one encrypted JSON document per file.
//!
//! Password values are additionally encrypted field by field inside the
//! sealed document. A field that fails to open is either replaced with
//! [`DECRYPTION_ERROR_PLACEHOLDER`] or aborts the load, depending on the
//! codec's [`DecryptPolicy`]. A failure of the outer blob always aborts.

use std::path::Path;

use strongbox_core::{DECRYPTION_ERROR_PLACEHOLDER, RecordKind, StrongboxError, VaultRecord};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::cipher::CipherEngine;
use crate::fs::write_atomic;

/// What to do with a secret field that fails to decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptPolicy {
    /// Any failure aborts the load.
    Strict,
    /// Substitute the placeholder for the field and keep loading.
    Placeholder,
}

/// Loads and saves one record collection under a [`CipherEngine`].
#[derive(Debug, Clone, Copy)]
pub struct RecordCodec {
    policy: DecryptPolicy,
}

impl RecordCodec {
    pub fn new(policy: DecryptPolicy) -> Self {
        Self { policy }
    }

    /// Passwords tolerate per-field failures; notes do not.
    pub fn for_kind(kind: RecordKind) -> Self {
        match kind {
            RecordKind::Passwords => Self::new(DecryptPolicy::Placeholder),
            RecordKind::Notes => Self::new(DecryptPolicy::Strict),
        }
    }

    pub fn strict() -> Self {
        Self::new(DecryptPolicy::Strict)
    }

    pub fn policy(&self) -> DecryptPolicy {
        self.policy
    }

    /// Read the collection at `path`. A missing or empty file is an empty
    /// collection.
    pub fn load<R: VaultRecord>(
        &self,
        path: &Path,
        engine: &CipherEngine,
    ) -> Result<Vec<R>, StrongboxError> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), kind = %R::KIND, "record file absent");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(StrongboxError::RecordFile {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let records = self.decode(path, &raw, engine)?;
        debug!(path = %path.display(), kind = %R::KIND, count = records.len(), "records loaded");
        Ok(records)
    }

    /// Seal `records` and atomically replace the file at `path`.
    pub fn save<R: VaultRecord>(
        &self,
        path: &Path,
        engine: &CipherEngine,
        records: &[R],
    ) -> Result<(), StrongboxError> {
        let blob = encode(engine, records)?;
        write_atomic(path, &blob, true).map_err(|source| StrongboxError::RecordFile {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), kind = %R::KIND, count = records.len(), "records saved");
        Ok(())
    }

    /// Turn file contents into records. `path` is used for diagnostics only.
    pub(crate) fn decode<R: VaultRecord>(
        &self,
        path: &Path,
        raw: &[u8],
        engine: &CipherEngine,
    ) -> Result<Vec<R>, StrongboxError> {
        if raw.trim_ascii().is_empty() {
            return Ok(Vec::new());
        }

        let mut records: Vec<R> = match engine.decrypt(raw) {
            Ok(plaintext) => {
                let plaintext = Zeroizing::new(plaintext);
                serde_json::from_slice(&plaintext)?
            }
            Err(e) if R::FIELD_SEALED => match serde_json::from_slice::<Vec<R>>(raw) {
                // Older password files kept the array in the clear with only
                // the values encrypted.
                Ok(records) => {
                    warn!(
                        path = %path.display(),
                        "record file uses the unsealed legacy layout, it will be sealed on next save"
                    );
                    records
                }
                Err(_) => return Err(e),
            },
            Err(e) => return Err(e),
        };

        if R::FIELD_SEALED {
            for record in &mut records {
                match engine.decrypt_text(record.secret()) {
                    Ok(value) => record.set_secret(value),
                    Err(e) if self.policy == DecryptPolicy::Placeholder => {
                        warn!(
                            path = %path.display(),
                            id = %record.id(),
                            error = %e,
                            "secret field could not be decrypted, substituting placeholder"
                        );
                        record.set_secret(DECRYPTION_ERROR_PLACEHOLDER.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(records)
    }
}

/// Serialize and seal `records` into file contents.
pub(crate) fn encode<R: VaultRecord>(
    engine: &CipherEngine,
    records: &[R],
) -> Result<Vec<u8>, StrongboxError> {
    let json = if R::FIELD_SEALED {
        let mut sealed = records.to_vec();
        for record in &mut sealed {
            let value = engine.encrypt_text(record.secret())?;
            record.set_secret(value);
        }
        Zeroizing::new(serde_json::to_vec(&sealed)?)
    } else {
        Zeroizing::new(serde_json::to_vec(records)?)
    };
    engine.encrypt(&json)
}
