// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongbox list`, `strongbox export`, and `strongbox import`.

use std::path::Path;

use strongbox_core::{PasswordEntry, RecordKind, SecureNote, StrongboxError};
use strongbox_vault::Vault;

/// One listing line per password. Values are never printed.
fn password_line(p: &PasswordEntry) -> String {
    format!("{}  {}  {}  [{}]", p.id, p.website, p.username, p.category)
}

fn note_line(n: &SecureNote) -> String {
    if n.category.is_empty() {
        format!("{}  {}", n.id, n.title)
    } else {
        format!("{}  {}  [{}]", n.id, n.title, n.category)
    }
}

pub fn run_list(vault: &Vault, kind: RecordKind) -> Result<(), StrongboxError> {
    let lines: Vec<String> = match kind {
        RecordKind::Passwords => vault.passwords()?.iter().map(password_line).collect(),
        RecordKind::Notes => vault.notes()?.iter().map(note_line).collect(),
    };
    if lines.is_empty() {
        println!("strongbox: no {kind} stored");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

pub fn run_export(
    vault: &Vault,
    kind: RecordKind,
    path: &Path,
    include_secrets: bool,
) -> Result<(), StrongboxError> {
    let count = match kind {
        RecordKind::Passwords => vault.export_records::<PasswordEntry>(path, include_secrets)?,
        RecordKind::Notes => vault.export_records::<SecureNote>(path, include_secrets)?,
    };
    println!("strongbox: exported {count} {kind} to {}", path.display());
    if include_secrets {
        eprintln!("strongbox: the export contains cleartext secrets, delete it after use");
    }
    Ok(())
}

pub fn run_import(vault: &Vault, kind: RecordKind, path: &Path) -> Result<(), StrongboxError> {
    let count = match kind {
        RecordKind::Passwords => vault.import_records::<PasswordEntry>(path)?,
        RecordKind::Notes => vault.import_records::<SecureNote>(path)?,
    };
    println!("strongbox: imported {count} {kind} from {}", path.display());
    Ok(())
}
