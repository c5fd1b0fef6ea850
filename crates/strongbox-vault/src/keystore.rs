// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key file persistence.
//!
//! Two on-disk formats are accepted:
//! - structured JSON `{key, algorithm, salt?, nonce?}` with standard base64
//!   values (always written)
//! - a legacy raw key with no wrapper (read only)
//!
//! A missing key file means a fresh vault. A key file that cannot be read or
//! parsed is copied aside and replaced with new material; data sealed under
//! the lost key then fails to decrypt.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use strongbox_core::{Algorithm, StrongboxError};
use tracing::{debug, info, warn};

use crate::cipher::CipherEngine;
use crate::fs::{sibling, write_atomic};
use crate::key_material::{KeyFileDoc, KeyMaterial};

/// Suffix for the copy of a key file that had to be regenerated.
pub const UNREADABLE_SUFFIX: &str = "unreadable";

/// The vault's key file and the material loaded from it.
#[derive(Debug)]
pub struct KeyStore {
    path: PathBuf,
    material: KeyMaterial,
}

impl KeyStore {
    /// Load the key file at `path`, creating or regenerating it as needed.
    ///
    /// `requested` only applies to newly generated material. An existing
    /// structured key file keeps its own algorithm.
    pub fn load_or_create(
        path: &Path,
        requested: Algorithm,
    ) -> Result<(Self, CipherEngine), StrongboxError> {
        let material = match read_key_file(path) {
            Ok(Some(material)) => {
                if material.algorithm() != requested {
                    warn!(
                        path = %path.display(),
                        file_algorithm = %material.algorithm(),
                        requested = %requested,
                        "key file algorithm differs from configuration, using key file"
                    );
                }
                debug!(path = %path.display(), algorithm = %material.algorithm(), "key file loaded");
                material
            }
            Ok(None) => {
                let material = KeyMaterial::generate(requested)?;
                persist(path, &material)?;
                info!(path = %path.display(), algorithm = %requested, "generated new key file");
                material
            }
            Err(
                e @ (StrongboxError::KeyFileUnreadable { .. } | StrongboxError::KeyFileCorrupt { .. }),
            ) => {
                warn!(
                    error = %e,
                    "key file could not be used, generating new key material; \
                     data sealed under the previous key will not decrypt"
                );
                set_aside(path);
                let material = KeyMaterial::generate(requested)?;
                persist(path, &material)?;
                material
            }
            Err(e) => return Err(e),
        };

        let engine = CipherEngine::new(&material)?;
        Ok((
            Self {
                path: path.to_path_buf(),
                material,
            },
            engine,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    pub fn algorithm(&self) -> Algorithm {
        self.material.algorithm()
    }

    /// A fresh engine for the current material.
    pub fn engine(&self) -> Result<CipherEngine, StrongboxError> {
        CipherEngine::new(&self.material)
    }

    /// Time since the key file was last written, if the filesystem reports it.
    pub fn age(&self) -> Option<Duration> {
        let modified = std::fs::metadata(&self.path).ok()?.modified().ok()?;
        SystemTime::now().duration_since(modified).ok()
    }

    /// Swap in material that rotation has already committed to disk.
    pub(crate) fn replace_material(&mut self, material: KeyMaterial) {
        self.material = material;
    }
}

/// Serialize key material in the structured key file format.
pub(crate) fn encode_key_file(material: &KeyMaterial) -> Result<Vec<u8>, StrongboxError> {
    Ok(serde_json::to_vec_pretty(&material.to_document())?)
}

/// Parse the key file at `path`.
///
/// `Ok(None)` when the file does not exist.
pub(crate) fn read_key_file(path: &Path) -> Result<Option<KeyMaterial>, StrongboxError> {
    let raw = match std::fs::read(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StrongboxError::KeyFileUnreadable {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_key_file(path, &raw).map(Some)
}

fn parse_key_file(path: &Path, raw: &[u8]) -> Result<KeyMaterial, StrongboxError> {
    let corrupt = |reason: String| StrongboxError::KeyFileCorrupt {
        path: path.to_path_buf(),
        reason,
    };

    match serde_json::from_slice::<serde_json::Value>(raw) {
        // Anything that is not JSON at all is a legacy raw key.
        Err(_) => KeyMaterial::from_legacy_raw(raw).ok_or_else(|| corrupt("key file is empty".to_string())),
        Ok(value) => {
            let doc: KeyFileDoc = serde_json::from_value(value)
                .map_err(|e| corrupt(format!("unexpected key file layout: {e}")))?;
            KeyMaterial::from_document(&doc).map_err(corrupt)
        }
    }
}

fn persist(path: &Path, material: &KeyMaterial) -> Result<(), StrongboxError> {
    write_atomic(path, &encode_key_file(material)?, true)?;
    Ok(())
}

/// Keep a copy of an unusable key file so it can be inspected or restored.
///
/// Earlier copies are never overwritten: the first free name among
/// `<key>.unreadable`, `<key>.unreadable.1`, ... is used.
fn set_aside(path: &Path) {
    let backup = match backup_path(path) {
        Some(backup) => backup,
        None => {
            warn!(path = %path.display(), "no free name to preserve previous key file");
            return;
        }
    };
    match std::fs::copy(path, &backup) {
        Ok(_) => warn!(backup = %backup.display(), "previous key file preserved"),
        Err(e) => debug!(error = %e, "previous key file could not be preserved"),
    }
}

fn backup_path(path: &Path) -> Option<PathBuf> {
    let first = sibling(path, UNREADABLE_SUFFIX);
    if !first.exists() {
        return Some(first);
    }
    (1..1000u32)
        .map(|n| sibling(path, &format!("{UNREADABLE_SUFFIX}.{n}")))
        .find(|candidate| !candidate.exists())
}
