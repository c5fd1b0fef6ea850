// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongbox rotate-key` and `strongbox change-algorithm`.

use strongbox_core::{Algorithm, StrongboxError};
use strongbox_vault::Vault;

pub fn run_rotate_key(vault: &mut Vault) -> Result<(), StrongboxError> {
    vault.rotate_key()?;
    println!("strongbox: key rotated ({})", vault.algorithm());
    Ok(())
}

pub fn run_change_algorithm(vault: &mut Vault, algorithm: Algorithm) -> Result<(), StrongboxError> {
    let from = vault.algorithm();
    vault.change_algorithm(algorithm)?;
    if from == algorithm {
        println!("strongbox: already using {algorithm}, key rotated");
    } else {
        println!("strongbox: switched {from} -> {algorithm} with a new key");
    }
    Ok(())
}
