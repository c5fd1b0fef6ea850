// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plaintext JSON export and import of record collections.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strongbox_core::{REDACTED_MARKER, RecordKind, StrongboxError, VaultRecord};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::fs::write_atomic;

/// Format tag written into every export envelope.
pub const EXPORT_FORMAT: &str = "strongbox-export-v1";

const CLEARTEXT_WARNING: &str =
    "This file contains secrets in cleartext. Store it securely and delete it after use.";

#[derive(Debug, Serialize)]
struct Envelope<R> {
    format: String,
    kind: RecordKind,
    exported_at: DateTime<Utc>,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    records: Vec<R>,
}

/// Accepted import layouts: the envelope, or a bare array from older exports.
///
/// Records stay untyped until the envelope header has been checked.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDoc {
    Envelope {
        format: String,
        kind: String,
        records: Vec<serde_json::Value>,
    },
    Bare(Vec<serde_json::Value>),
}

/// Write `records` to `path` as an export envelope.
///
/// Unless `include_secret_values` is set every secret field is replaced by
/// [`REDACTED_MARKER`]. Returns the number of records written.
pub fn export_records<R: VaultRecord>(
    path: &Path,
    records: &[R],
    include_secret_values: bool,
) -> Result<usize, StrongboxError> {
    let mut records = records.to_vec();
    if !include_secret_values {
        for record in &mut records {
            record.set_secret(REDACTED_MARKER.to_string());
        }
    }

    let envelope = Envelope {
        format: EXPORT_FORMAT.to_string(),
        kind: R::KIND,
        exported_at: Utc::now(),
        count: records.len(),
        warning: include_secret_values.then(|| CLEARTEXT_WARNING.to_string()),
        records,
    };
    let json = Zeroizing::new(serde_json::to_vec_pretty(&envelope)?);
    write_atomic(path, &json, true).map_err(|source| StrongboxError::RecordFile {
        path: path.to_path_buf(),
        source,
    })?;

    if include_secret_values {
        warn!(path = %path.display(), kind = %R::KIND, count = envelope.count, "exported records with cleartext secrets");
    } else {
        info!(path = %path.display(), kind = %R::KIND, count = envelope.count, "exported redacted records");
    }
    Ok(envelope.count)
}

/// Read records for import from `path`.
///
/// Records whose secret is the redaction marker are dropped. Survivors get
/// a fresh id and current timestamps.
pub fn read_import<R: VaultRecord>(path: &Path) -> Result<Vec<R>, StrongboxError> {
    let raw = Zeroizing::new(std::fs::read(path).map_err(|source| StrongboxError::RecordFile {
        path: path.to_path_buf(),
        source,
    })?);

    let records = match serde_json::from_slice::<ImportDoc>(&raw)? {
        ImportDoc::Envelope {
            format,
            kind,
            records,
        } => {
            if format != EXPORT_FORMAT || kind != R::KIND.to_string() {
                return Err(StrongboxError::RecordFile {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!(
                            "expected a {EXPORT_FORMAT} export of {}, found {format} of {kind}",
                            R::KIND
                        ),
                    ),
                });
            }
            records
        }
        ImportDoc::Bare(records) => records,
    };
    let records: Vec<R> = serde_json::from_value(serde_json::Value::Array(records))?;

    let total = records.len();
    let accepted: Vec<R> = records
        .into_iter()
        .filter(|r| r.secret() != REDACTED_MARKER)
        .map(|mut r| {
            r.reissue();
            r
        })
        .collect();

    let skipped = total - accepted.len();
    if skipped > 0 {
        info!(path = %path.display(), skipped, "skipped redacted records");
    }
    Ok(accepted)
}
