// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key rotation and algorithm changes with a staged, journaled commit.
//!
//! A rotation never edits live files in place:
//! 1. every collection is read strictly under the current key
//! 2. new key material is generated
//! 3. the new key and every re-sealed collection are written to
//!    `<file>.staged` and read back under the new key
//! 4. `rotation.journal` is written; this is the commit point
//! 5. staged record files are renamed over their targets, then the key file
//! 6. the journal is removed
//!
//! [`RotationManager::recover`] finishes a journaled rotation and discards
//! staged files that never reached the commit point.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_config::ROTATION_JOURNAL_FILE;
use strongbox_core::{Algorithm, PasswordEntry, RecordKind, SecureNote, StrongboxError, VaultRecord};
use tracing::{debug, error, info, warn};

use crate::cipher::CipherEngine;
use crate::codec::{self, RecordCodec};
use crate::fs::{sibling, write_atomic};
use crate::key_material::KeyMaterial;
use crate::keystore::{encode_key_file, KeyStore};

/// Suffix of files written during a rotation before the commit point.
pub const STAGED_SUFFIX: &str = "staged";

/// A record file taking part in a rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFile {
    pub kind: RecordKind,
    pub path: PathBuf,
}

impl CollectionFile {
    pub fn new(kind: RecordKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// What [`RotationManager::recover`] found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// No interrupted rotation.
    Clean,
    /// A committed rotation was completed; `files` staged files were moved.
    RolledForward { files: usize },
    /// An uncommitted rotation was discarded; `files` staged files were removed.
    RolledBack { files: usize },
}

#[derive(Debug, Serialize, Deserialize)]
struct Journal {
    started_at: DateTime<Utc>,
    algorithm: Algorithm,
    /// In application order: record files first, key file last.
    moves: Vec<StagedMove>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StagedMove {
    staged: PathBuf,
    target: PathBuf,
}

/// Decrypted contents of one collection, held between read and re-seal.
enum Snapshot {
    Passwords(Vec<PasswordEntry>),
    Notes(Vec<SecureNote>),
}

impl Snapshot {
    fn read(file: &CollectionFile, engine: &CipherEngine) -> Result<Self, StrongboxError> {
        let codec = RecordCodec::strict();
        Ok(match file.kind {
            RecordKind::Passwords => Snapshot::Passwords(codec.load(&file.path, engine)?),
            RecordKind::Notes => Snapshot::Notes(codec.load(&file.path, engine)?),
        })
    }

    fn len(&self) -> usize {
        match self {
            Snapshot::Passwords(r) => r.len(),
            Snapshot::Notes(r) => r.len(),
        }
    }

    fn encode(&self, engine: &CipherEngine) -> Result<Vec<u8>, StrongboxError> {
        match self {
            Snapshot::Passwords(r) => codec::encode(engine, r),
            Snapshot::Notes(r) => codec::encode(engine, r),
        }
    }

    /// Whether `raw` opens under `engine` to exactly this snapshot.
    fn matches(&self, path: &Path, raw: &[u8], engine: &CipherEngine) -> Result<bool, StrongboxError> {
        Ok(match self {
            Snapshot::Passwords(r) => same(r, &RecordCodec::strict().decode(path, raw, engine)?),
            Snapshot::Notes(r) => same(r, &RecordCodec::strict().decode(path, raw, engine)?),
        })
    }
}

fn same<R: VaultRecord + PartialEq>(a: &[R], b: &[R]) -> bool {
    a == b
}

/// Runs rotations for the vault whose journal lives in `dir`.
#[derive(Debug, Clone)]
pub struct RotationManager {
    journal_path: PathBuf,
}

impl RotationManager {
    pub fn new(dir: &Path) -> Self {
        Self {
            journal_path: dir.join(ROTATION_JOURNAL_FILE),
        }
    }

    /// Replace the key (same algorithm) and re-seal every collection.
    ///
    /// Returns the engine for the new key. On success `store` holds the new
    /// material.
    pub fn rotate_key(
        &self,
        store: &mut KeyStore,
        collections: &[CollectionFile],
    ) -> Result<CipherEngine, StrongboxError> {
        let algorithm = store.algorithm();
        self.rotate_to(store, collections, algorithm)
    }

    /// Switch to `algorithm` with a new key and re-seal every collection.
    ///
    /// Choosing the current algorithm still produces a new key.
    pub fn change_algorithm(
        &self,
        store: &mut KeyStore,
        collections: &[CollectionFile],
        algorithm: Algorithm,
    ) -> Result<CipherEngine, StrongboxError> {
        self.rotate_to(store, collections, algorithm)
    }

    fn rotate_to(
        &self,
        store: &mut KeyStore,
        collections: &[CollectionFile],
        algorithm: Algorithm,
    ) -> Result<CipherEngine, StrongboxError> {
        // Staging next to a leftover journal would let a later replay mix
        // its moves with files sealed under a key that was never committed.
        if self.journal_path.exists() {
            return Err(StrongboxError::PartialRotationFailure {
                message: format!(
                    "a previous rotation journal is still present at {}; reopen the vault to finish it",
                    self.journal_path.display()
                ),
            });
        }

        let from = store.algorithm();
        let snapshots = self.snapshot(store, collections)?;

        let material = KeyMaterial::generate(algorithm)?;
        let engine = CipherEngine::new(&material)?;

        let journal = self.stage(store.path(), &material, &engine, &snapshots)?;
        self.commit(&journal)?;

        store.replace_material(material);
        info!(
            from = %from,
            to = %algorithm,
            collections = snapshots.len(),
            "key rotation committed"
        );
        Ok(engine)
    }

    /// Read every collection strictly under the current key.
    fn snapshot(
        &self,
        store: &KeyStore,
        collections: &[CollectionFile],
    ) -> Result<Vec<(CollectionFile, Snapshot)>, StrongboxError> {
        let current = store.engine()?;
        let mut snapshots = Vec::with_capacity(collections.len());
        for file in collections {
            if !file.path.exists() {
                debug!(path = %file.path.display(), "collection absent, nothing to re-seal");
                continue;
            }
            let snapshot = Snapshot::read(file, &current)?;
            debug!(path = %file.path.display(), count = snapshot.len(), "collection read for rotation");
            snapshots.push((file.clone(), snapshot));
        }
        Ok(snapshots)
    }

    /// Write and verify every staged file. Nothing live is touched; on
    /// failure all staged files are removed.
    fn stage(
        &self,
        key_path: &Path,
        material: &KeyMaterial,
        engine: &CipherEngine,
        snapshots: &[(CollectionFile, Snapshot)],
    ) -> Result<Journal, StrongboxError> {
        let mut moves = Vec::with_capacity(snapshots.len() + 1);
        let result = (|| -> Result<(), StrongboxError> {
            for (file, snapshot) in snapshots {
                let staged = sibling(&file.path, STAGED_SUFFIX);
                moves.push(StagedMove {
                    staged: staged.clone(),
                    target: file.path.clone(),
                });
                write_atomic(&staged, &snapshot.encode(engine)?, true)?;

                let written = std::fs::read(&staged)?;
                if !snapshot.matches(&staged, &written, engine)? {
                    return Err(StrongboxError::Crypto(format!(
                        "staged {} does not read back to the original records",
                        staged.display()
                    )));
                }
            }

            let staged_key = sibling(key_path, STAGED_SUFFIX);
            moves.push(StagedMove {
                staged: staged_key.clone(),
                target: key_path.to_path_buf(),
            });
            write_atomic(&staged_key, &encode_key_file(material)?, true)?;
            Ok(())
        })();

        match result {
            Ok(()) => Ok(Journal {
                started_at: Utc::now(),
                algorithm: material.algorithm(),
                moves,
            }),
            Err(e) => {
                warn!(error = %e, "rotation aborted before commit, discarding staged files");
                discard(&moves);
                Err(e)
            }
        }
    }

    /// Write the journal, then move every staged file into place.
    fn commit(&self, journal: &Journal) -> Result<(), StrongboxError> {
        let encoded = serde_json::to_vec_pretty(journal)?;
        if let Err(e) = write_atomic(&self.journal_path, &encoded, true) {
            warn!(error = %e, "rotation journal could not be written, discarding staged files");
            discard(&journal.moves);
            return Err(e.into());
        }

        let moved = apply(&journal.moves).map_err(|e| {
            error!(
                journal = %self.journal_path.display(),
                error = %e,
                "rotation committed but files could not be replaced"
            );
            StrongboxError::PartialRotationFailure {
                message: format!(
                    "{e}; the journal at {} will be replayed on next open",
                    self.journal_path.display()
                ),
            }
        })?;
        debug!(files = moved, "staged files moved into place");

        if let Err(e) = std::fs::remove_file(&self.journal_path) {
            warn!(error = %e, "rotation finished but its journal could not be removed");
        }
        Ok(())
    }

    /// Finish or discard an interrupted rotation.
    ///
    /// `key_path` and `collections` name the files whose orphaned staged
    /// copies should be removed when no journal exists.
    pub fn recover(
        &self,
        key_path: &Path,
        collections: &[CollectionFile],
    ) -> Result<RecoveryOutcome, StrongboxError> {
        match std::fs::read(&self.journal_path) {
            Ok(raw) => {
                let journal: Journal = serde_json::from_slice(&raw).map_err(|e| {
                    StrongboxError::PartialRotationFailure {
                        message: format!(
                            "rotation journal {} is unreadable: {e}",
                            self.journal_path.display()
                        ),
                    }
                })?;
                let files = apply(&journal.moves).map_err(|e| StrongboxError::PartialRotationFailure {
                    message: format!("replaying rotation journal failed: {e}"),
                })?;
                std::fs::remove_file(&self.journal_path)?;
                warn!(
                    files,
                    algorithm = %journal.algorithm,
                    started_at = %journal.started_at,
                    "completed interrupted key rotation"
                );
                Ok(RecoveryOutcome::RolledForward { files })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let targets = collections
                    .iter()
                    .map(|c| c.path.as_path())
                    .chain(std::iter::once(key_path));
                let mut files = 0;
                for target in targets {
                    let staged = sibling(target, STAGED_SUFFIX);
                    if staged.exists() {
                        std::fs::remove_file(&staged)?;
                        files += 1;
                    }
                }
                if files == 0 {
                    return Ok(RecoveryOutcome::Clean);
                }
                warn!(files, "discarded staged files from an uncommitted key rotation");
                Ok(RecoveryOutcome::RolledBack { files })
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Rename staged files over their targets, in order. A staged file that is
/// already gone was moved by an earlier attempt.
fn apply(moves: &[StagedMove]) -> std::io::Result<usize> {
    let mut moved = 0;
    for m in moves {
        match std::fs::rename(&m.staged, &m.target) {
            Ok(()) => moved += 1,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(staged = %m.staged.display(), "already applied");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(moved)
}

fn discard(moves: &[StagedMove]) {
    for m in moves {
        if let Err(e) = std::fs::remove_file(&m.staged)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(staged = %m.staged.display(), error = %e, "staged file could not be removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    struct Fixture {
        dir: tempfile::TempDir,
        store: KeyStore,
        collections: Vec<CollectionFile>,
        passwords: Vec<PasswordEntry>,
        notes: Vec<SecureNote>,
    }

    impl Fixture {
        fn new(algorithm: Algorithm) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let (store, engine) =
                KeyStore::load_or_create(&dir.path().join("encryption_key.key"), algorithm).unwrap();
            let collections = vec![
                CollectionFile::new(RecordKind::Passwords, dir.path().join("passwords.json")),
                CollectionFile::new(RecordKind::Notes, dir.path().join("secure_notes.json")),
            ];
            let passwords = vec![
                PasswordEntry::new("pw-one", "one.example", "ann"),
                PasswordEntry::new("pw-two", "two.example", "ben").with_notes("backup codes in drawer"),
            ];
            let notes = vec![SecureNote::new("wifi", "hunter2"), SecureNote::new("safe", "12-34-56")];
            let codec = RecordCodec::strict();
            codec.save(&collections[0].path, &engine, &passwords).unwrap();
            codec.save(&collections[1].path, &engine, &notes).unwrap();
            Self {
                dir,
                store,
                collections,
                passwords,
                notes,
            }
        }

        fn manager(&self) -> RotationManager {
            RotationManager::new(self.dir.path())
        }

        fn assert_contents(&self, engine: &CipherEngine) {
            let codec = RecordCodec::strict();
            let passwords: Vec<PasswordEntry> = codec.load(&self.collections[0].path, engine).unwrap();
            let notes: Vec<SecureNote> = codec.load(&self.collections[1].path, engine).unwrap();
            assert_eq!(passwords, self.passwords);
            assert_eq!(notes, self.notes);
        }

        fn staged_files(&self) -> usize {
            std::fs::read_dir(self.dir.path())
                .unwrap()
                .filter(|e| {
                    e.as_ref()
                        .unwrap()
                        .file_name()
                        .to_string_lossy()
                        .ends_with(".staged")
                })
                .count()
        }
    }

    #[test]
    fn rotate_key_preserves_content_under_new_key() {
        let mut fx = Fixture::new(Algorithm::AesGcm);
        let old_engine = fx.store.engine().unwrap();
        let old_blob = std::fs::read(&fx.collections[1].path).unwrap();

        let engine = fx.manager().rotate_key(&mut fx.store, &fx.collections).unwrap();
        assert_eq!(engine.algorithm(), Algorithm::AesGcm);
        fx.assert_contents(&engine);

        // The old key no longer opens the rewritten file.
        let new_blob = std::fs::read(&fx.collections[1].path).unwrap();
        assert_ne!(old_blob, new_blob);
        assert!(old_engine.decrypt(&new_blob).unwrap_err().is_authentication());

        // The key file on disk matches the store.
        let (reloaded, reloaded_engine) =
            KeyStore::load_or_create(fx.store.path(), Algorithm::Fernet).unwrap();
        assert_eq!(reloaded.algorithm(), Algorithm::AesGcm);
        fx.assert_contents(&reloaded_engine);

        assert_eq!(fx.staged_files(), 0);
        assert!(!fx.dir.path().join(ROTATION_JOURNAL_FILE).exists());
    }

    #[test]
    fn change_algorithm_preserves_content() {
        let mut fx = Fixture::new(Algorithm::Fernet);
        let engine = fx
            .manager()
            .change_algorithm(&mut fx.store, &fx.collections, Algorithm::ChaCha20)
            .unwrap();
        assert_eq!(fx.store.algorithm(), Algorithm::ChaCha20);
        assert_eq!(engine.algorithm(), Algorithm::ChaCha20);
        fx.assert_contents(&engine);
    }

    #[test]
    fn change_to_same_algorithm_still_rotates() {
        let mut fx = Fixture::new(Algorithm::ChaCha20);
        let before = std::fs::read(fx.store.path()).unwrap();
        fx.manager()
            .change_algorithm(&mut fx.store, &fx.collections, Algorithm::ChaCha20)
            .unwrap();
        assert_ne!(std::fs::read(fx.store.path()).unwrap(), before);
    }

    #[test]
    fn absent_collections_are_skipped() {
        let mut fx = Fixture::new(Algorithm::Fernet);
        std::fs::remove_file(&fx.collections[1].path).unwrap();
        let engine = fx.manager().rotate_key(&mut fx.store, &fx.collections).unwrap();
        assert!(!fx.collections[1].path.exists());
        let passwords: Vec<PasswordEntry> =
            RecordCodec::strict().load(&fx.collections[0].path, &engine).unwrap();
        assert_eq!(passwords, fx.passwords);
    }

    #[test]
    fn undecryptable_collection_aborts_before_touching_files() {
        let mut fx = Fixture::new(Algorithm::AesGcm);
        std::fs::write(&fx.collections[1].path, b"garbage that is not a sealed blob").unwrap();
        let key_before = std::fs::read(fx.store.path()).unwrap();
        let passwords_before = std::fs::read(&fx.collections[0].path).unwrap();

        let err = fx.manager().rotate_key(&mut fx.store, &fx.collections).unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(std::fs::read(fx.store.path()).unwrap(), key_before);
        assert_eq!(std::fs::read(&fx.collections[0].path).unwrap(), passwords_before);
        assert_eq!(fx.staged_files(), 0);
    }

    #[test]
    fn staging_failure_cleans_up_and_leaves_vault_intact() {
        let mut fx = Fixture::new(Algorithm::Fernet);
        // A directory squatting on the staged notes path makes the rename fail.
        std::fs::create_dir(sibling(&fx.collections[1].path, STAGED_SUFFIX)).unwrap();
        let key_before = std::fs::read(fx.store.path()).unwrap();

        fx.manager()
            .rotate_key(&mut fx.store, &fx.collections)
            .unwrap_err();

        assert_eq!(std::fs::read(fx.store.path()).unwrap(), key_before);
        assert!(!sibling(&fx.collections[0].path, STAGED_SUFFIX).exists());
        assert!(!sibling(fx.store.path(), STAGED_SUFFIX).exists());
        fx.assert_contents(&fx.store.engine().unwrap());
    }

    #[test]
    #[traced_test]
    fn recover_rolls_journaled_rotation_forward() {
        let fx = Fixture::new(Algorithm::Fernet);
        let manager = fx.manager();
        let snapshots = manager.snapshot(&fx.store, &fx.collections).unwrap();
        let material = KeyMaterial::generate(Algorithm::AesGcm).unwrap();
        let engine = CipherEngine::new(&material).unwrap();
        let journal = manager
            .stage(fx.store.path(), &material, &engine, &snapshots)
            .unwrap();
        // Crash right after the commit point.
        write_atomic(
            &fx.dir.path().join(ROTATION_JOURNAL_FILE),
            &serde_json::to_vec(&journal).unwrap(),
            true,
        )
        .unwrap();

        let outcome = manager.recover(fx.store.path(), &fx.collections).unwrap();
        assert_eq!(outcome, RecoveryOutcome::RolledForward { files: 3 });
        assert!(logs_contain("completed interrupted key rotation"));

        let (store, reopened) = KeyStore::load_or_create(fx.store.path(), Algorithm::Fernet).unwrap();
        assert_eq!(store.algorithm(), Algorithm::AesGcm);
        fx.assert_contents(&reopened);
        assert_eq!(fx.staged_files(), 0);
    }

    #[test]
    fn recover_replays_a_half_applied_journal() {
        let fx = Fixture::new(Algorithm::ChaCha20);
        let manager = fx.manager();
        let snapshots = manager.snapshot(&fx.store, &fx.collections).unwrap();
        let material = KeyMaterial::generate(Algorithm::ChaCha20).unwrap();
        let engine = CipherEngine::new(&material).unwrap();
        let journal = manager
            .stage(fx.store.path(), &material, &engine, &snapshots)
            .unwrap();
        write_atomic(
            &fx.dir.path().join(ROTATION_JOURNAL_FILE),
            &serde_json::to_vec(&journal).unwrap(),
            true,
        )
        .unwrap();
        // The first record file was already moved before the crash.
        std::fs::rename(&journal.moves[0].staged, &journal.moves[0].target).unwrap();

        let outcome = manager.recover(fx.store.path(), &fx.collections).unwrap();
        assert_eq!(outcome, RecoveryOutcome::RolledForward { files: 2 });
        fx.assert_contents(&engine);
    }

    #[test]
    fn recover_discards_uncommitted_staging() {
        let fx = Fixture::new(Algorithm::Fernet);
        let manager = fx.manager();
        let snapshots = manager.snapshot(&fx.store, &fx.collections).unwrap();
        let material = KeyMaterial::generate(Algorithm::Fernet).unwrap();
        let engine = CipherEngine::new(&material).unwrap();
        manager
            .stage(fx.store.path(), &material, &engine, &snapshots)
            .unwrap();

        let outcome = manager.recover(fx.store.path(), &fx.collections).unwrap();
        assert_eq!(outcome, RecoveryOutcome::RolledBack { files: 3 });
        assert_eq!(fx.staged_files(), 0);
        fx.assert_contents(&fx.store.engine().unwrap());
    }

    #[test]
    fn leftover_journal_blocks_rotation_until_recovered() {
        let mut fx = Fixture::new(Algorithm::Fernet);
        let manager = fx.manager();
        let journal_path = fx.dir.path().join(ROTATION_JOURNAL_FILE);

        // A completed rotation whose journal could not be removed.
        let snapshots = manager.snapshot(&fx.store, &fx.collections).unwrap();
        let material = KeyMaterial::generate(Algorithm::Fernet).unwrap();
        let engine = CipherEngine::new(&material).unwrap();
        let journal = manager
            .stage(fx.store.path(), &material, &engine, &snapshots)
            .unwrap();
        manager.commit(&journal).unwrap();
        write_atomic(&journal_path, &serde_json::to_vec(&journal).unwrap(), true).unwrap();
        let (store, _) = KeyStore::load_or_create(fx.store.path(), Algorithm::Fernet).unwrap();
        fx.store = store;
        let key_before = std::fs::read(fx.store.path()).unwrap();

        let err = manager
            .rotate_key(&mut fx.store, &fx.collections)
            .unwrap_err();
        assert!(matches!(err, StrongboxError::PartialRotationFailure { .. }), "{err}");
        assert_eq!(fx.staged_files(), 0);
        assert_eq!(std::fs::read(fx.store.path()).unwrap(), key_before);
        fx.assert_contents(&engine);

        // Replaying the stale journal moves nothing and clears the way.
        assert_eq!(
            manager.recover(fx.store.path(), &fx.collections).unwrap(),
            RecoveryOutcome::RolledForward { files: 0 }
        );
        assert!(!journal_path.exists());
        let engine = manager.rotate_key(&mut fx.store, &fx.collections).unwrap();
        fx.assert_contents(&engine);
    }

    #[test]
    #[traced_test]
    fn rename_failure_after_commit_point_is_partial_and_replayable() {
        let fx = Fixture::new(Algorithm::AesGcm);
        let manager = fx.manager();
        let snapshots = manager.snapshot(&fx.store, &fx.collections).unwrap();
        let material = KeyMaterial::generate(Algorithm::ChaCha20).unwrap();
        let engine = CipherEngine::new(&material).unwrap();
        let journal = manager
            .stage(fx.store.path(), &material, &engine, &snapshots)
            .unwrap();

        // A non-empty directory at the passwords path cannot be renamed over.
        let passwords = &fx.collections[0].path;
        std::fs::remove_file(passwords).unwrap();
        std::fs::create_dir(passwords).unwrap();
        std::fs::write(passwords.join("blocker"), b"x").unwrap();

        let err = manager.commit(&journal).unwrap_err();
        assert!(matches!(err, StrongboxError::PartialRotationFailure { .. }), "{err}");
        assert!(fx.dir.path().join(ROTATION_JOURNAL_FILE).exists());
        assert!(logs_contain("rotation committed but files could not be replaced"));

        std::fs::remove_dir_all(passwords).unwrap();
        assert_eq!(
            manager.recover(fx.store.path(), &fx.collections).unwrap(),
            RecoveryOutcome::RolledForward { files: 3 }
        );
        let (store, reopened) = KeyStore::load_or_create(fx.store.path(), Algorithm::AesGcm).unwrap();
        assert_eq!(store.algorithm(), Algorithm::ChaCha20);
        fx.assert_contents(&reopened);
    }

    #[test]
    fn recover_on_clean_vault_is_a_no_op() {
        let fx = Fixture::new(Algorithm::Fernet);
        assert_eq!(
            fx.manager().recover(fx.store.path(), &fx.collections).unwrap(),
            RecoveryOutcome::Clean
        );
    }
}
