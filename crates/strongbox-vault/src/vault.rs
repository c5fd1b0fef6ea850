// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The vault facade: one key file plus the record collections it protects.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use strongbox_config::{EncryptionConfig, VaultConfig};
use strongbox_core::{Algorithm, PasswordEntry, RecordKind, SecureNote, StrongboxError, VaultRecord};
use tracing::{debug, info};

use crate::cipher::CipherEngine;
use crate::codec::RecordCodec;
use crate::keystore::KeyStore;
use crate::rotation::{CollectionFile, RecoveryOutcome, RotationManager};
use crate::transfer;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// An open vault.
///
/// Every record operation reads the collection from disk and, when it
/// changes anything, writes it back before returning. A single process is
/// assumed per storage directory.
#[derive(Debug)]
pub struct Vault {
    config: VaultConfig,
    store: KeyStore,
    engine: CipherEngine,
    rotation: RotationManager,
}

impl Vault {
    /// Open (or create) the vault described by `vault`.
    ///
    /// Creates the storage directory, finishes or discards any interrupted
    /// rotation, then loads or creates the key with `encryption.algorithm`.
    pub fn open(vault: &VaultConfig, encryption: &EncryptionConfig) -> Result<Self, StrongboxError> {
        std::fs::create_dir_all(&vault.storage_location).map_err(|e| {
            StrongboxError::Config(format!(
                "cannot create storage location {}: {e}",
                vault.storage_location.display()
            ))
        })?;

        let rotation = RotationManager::new(&vault.storage_location);
        match rotation.recover(&vault.key_path(), &collections(vault))? {
            RecoveryOutcome::Clean => {}
            outcome => info!(?outcome, "recovered interrupted key rotation"),
        }

        let (store, engine) = KeyStore::load_or_create(&vault.key_path(), encryption.algorithm)?;
        debug!(
            storage = %vault.storage_location.display(),
            algorithm = %engine.algorithm(),
            "vault opened"
        );
        Ok(Self {
            config: vault.clone(),
            store,
            engine,
            rotation,
        })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.store
    }

    pub fn engine(&self) -> &CipherEngine {
        &self.engine
    }

    /// Algorithm actually protecting the vault (from the key file).
    pub fn algorithm(&self) -> Algorithm {
        self.engine.algorithm()
    }

    /// Whether the key is older than `policy_days`. Zero disables the check.
    pub fn rotation_due(&self, policy_days: u32) -> bool {
        if policy_days == 0 {
            return false;
        }
        let limit = Duration::from_secs(u64::from(policy_days) * SECONDS_PER_DAY);
        self.store.age().is_some_and(|age| age >= limit)
    }

    pub fn load_records<R: VaultRecord>(&self) -> Result<Vec<R>, StrongboxError> {
        RecordCodec::for_kind(R::KIND).load(&self.config.record_path(R::KIND), &self.engine)
    }

    pub fn save_records<R: VaultRecord>(&self, records: &[R]) -> Result<(), StrongboxError> {
        RecordCodec::for_kind(R::KIND).save(&self.config.record_path(R::KIND), &self.engine, records)
    }

    pub fn passwords(&self) -> Result<Vec<PasswordEntry>, StrongboxError> {
        self.load_records()
    }

    pub fn save_passwords(&self, records: &[PasswordEntry]) -> Result<(), StrongboxError> {
        self.save_records(records)
    }

    pub fn notes(&self) -> Result<Vec<SecureNote>, StrongboxError> {
        self.load_records()
    }

    pub fn save_notes(&self, records: &[SecureNote]) -> Result<(), StrongboxError> {
        self.save_records(records)
    }

    /// Append `record` and return its id.
    pub fn add_record<R: VaultRecord>(&self, record: R) -> Result<String, StrongboxError> {
        let mut records = self.load_records::<R>()?;
        let id = record.id().to_string();
        records.push(record);
        self.save_records(&records)?;
        Ok(id)
    }

    pub fn get_record<R: VaultRecord>(&self, id: &str) -> Result<Option<R>, StrongboxError> {
        Ok(self.load_records::<R>()?.into_iter().find(|r| r.id() == id))
    }

    /// Apply `edit` to the record with `id`. The id and creation time are
    /// kept and the modification time bumped. Returns false when no record matches.
    pub fn update_record<R, F>(&self, id: &str, edit: F) -> Result<bool, StrongboxError>
    where
        R: VaultRecord,
        F: FnOnce(&mut R),
    {
        let mut records = self.load_records::<R>()?;
        let Some(record) = records.iter_mut().find(|r| r.id() == id) else {
            return Ok(false);
        };
        let original = record.clone();
        edit(record);
        record.inherit_identity(&original);
        record.touch();
        self.save_records(&records)?;
        Ok(true)
    }

    /// Remove the record with `id`. Returns false when no record matches.
    pub fn delete_record<R: VaultRecord>(&self, id: &str) -> Result<bool, StrongboxError> {
        let mut records = self.load_records::<R>()?;
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save_records(&records)?;
        Ok(true)
    }

    /// Passwords matching every given filter.
    ///
    /// `query` is a case-insensitive substring over website, username and
    /// notes. `category` and `website` are case-insensitive exact matches.
    pub fn search_passwords(
        &self,
        query: Option<&str>,
        category: Option<&str>,
        website: Option<&str>,
    ) -> Result<Vec<PasswordEntry>, StrongboxError> {
        let query = query.filter(|q| !q.is_empty());
        let category = category.filter(|c| !c.is_empty());
        let website = website.filter(|w| !w.is_empty());
        Ok(self
            .passwords()?
            .into_iter()
            .filter(|p| query.is_none_or(|q| p.matches(q)))
            .filter(|p| category.is_none_or(|c| p.category.eq_ignore_ascii_case(c)))
            .filter(|p| website.is_none_or(|w| p.website.eq_ignore_ascii_case(w)))
            .collect())
    }

    /// Notes whose title or content contains `term`. An empty term matches all.
    pub fn search_notes(&self, term: &str) -> Result<Vec<SecureNote>, StrongboxError> {
        let notes = self.notes()?;
        if term.is_empty() {
            return Ok(notes);
        }
        Ok(notes.into_iter().filter(|n| n.matches(term)).collect())
    }

    /// Distinct non-empty categories of a collection, sorted.
    pub fn categories<R: VaultRecord>(&self) -> Result<Vec<String>, StrongboxError> {
        let records = self.load_records::<R>()?;
        let set: BTreeSet<&str> = records
            .iter()
            .map(|r| r.category())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(set.into_iter().map(str::to_string).collect())
    }

    /// Distinct non-empty websites across all passwords, sorted.
    pub fn websites(&self) -> Result<Vec<String>, StrongboxError> {
        let passwords = self.passwords()?;
        let set: BTreeSet<&str> = passwords
            .iter()
            .map(|p| p.website.as_str())
            .filter(|w| !w.is_empty())
            .collect();
        Ok(set.into_iter().map(str::to_string).collect())
    }

    /// Replace the key, keeping the algorithm, and re-seal every collection.
    pub fn rotate_key(&mut self) -> Result<(), StrongboxError> {
        self.engine = self
            .rotation
            .rotate_key(&mut self.store, &collections(&self.config))?;
        Ok(())
    }

    /// Move the vault to `algorithm` with a new key.
    pub fn change_algorithm(&mut self, algorithm: Algorithm) -> Result<(), StrongboxError> {
        self.engine =
            self.rotation
                .change_algorithm(&mut self.store, &collections(&self.config), algorithm)?;
        Ok(())
    }

    /// Export a collection as JSON. Secrets are redacted unless
    /// `include_secret_values` is set.
    pub fn export_records<R: VaultRecord>(
        &self,
        path: &Path,
        include_secret_values: bool,
    ) -> Result<usize, StrongboxError> {
        let records = self.load_records::<R>()?;
        transfer::export_records(path, &records, include_secret_values)
    }

    /// Append the importable records in `path` and return how many were added.
    pub fn import_records<R: VaultRecord>(&self, path: &Path) -> Result<usize, StrongboxError> {
        let incoming = transfer::read_import::<R>(path)?;
        if incoming.is_empty() {
            return Ok(0);
        }
        let mut records = self.load_records::<R>()?;
        let count = incoming.len();
        records.extend(incoming);
        self.save_records(&records)?;
        info!(path = %path.display(), kind = %R::KIND, count, "imported records");
        Ok(count)
    }
}

fn collections(config: &VaultConfig) -> Vec<CollectionFile> {
    [RecordKind::Passwords, RecordKind::Notes]
        .into_iter()
        .map(|kind| CollectionFile::new(kind, config.record_path(kind)))
        .collect()
}
