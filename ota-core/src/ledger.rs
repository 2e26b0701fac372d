//! JSON ledgers and the remote layout they live in.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   projects.json              (Projects ledger, keyed by `name`)
//!   index.html                 (optional bucket index page)
//!   <app_name>/
//!     builds.json              (Builds ledger, keyed by `uploaded_at`)
//!     <YYYY-MM-DD>/
//!       <artifact>.ipa
//!       <artifact>.plist
//!       <artifact>.html
//! ```
//!
//! Ledgers are whole documents: read everything, modify in memory, write
//! everything back. Nothing here touches the network; see `ota-publish` for
//! the fetch/persist half of the protocol.

use serde::{de::DeserializeOwned, Serialize};

use crate::error::LedgerError;
use crate::types::{AppName, BuildFolder, LedgerEntry};

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

pub const PROJECTS_FILE: &str = "projects.json";
pub const BUILDS_FILE: &str = "builds.json";
pub const INDEX_FILE: &str = "index.html";

/// `<app_name>/builds.json`
pub fn builds_path(app: &AppName) -> String {
    format!("{}/{}", app.0, BUILDS_FILE)
}

/// `<app_name>/<build_folder>`
pub fn build_folder_path(app: &AppName, folder: &BuildFolder) -> String {
    format!("{}/{}", app.0, folder.0)
}

/// `<app_name>/<build_folder>/<file_name>`
pub fn build_file_path(app: &AppName, folder: &BuildFolder, file_name: &str) -> String {
    format!("{}/{}/{}", app.0, folder.0, file_name)
}

// ---------------------------------------------------------------------------
// 2. Codec
// ---------------------------------------------------------------------------

/// Parse a ledger document.
///
/// Empty or whitespace-only content is an empty ledger. Anything that is not
/// a JSON array of records is [`LedgerError::Malformed`].
pub fn decode<T: DeserializeOwned>(path: &str, bytes: &[u8]) -> Result<Vec<T>, LedgerError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes).map_err(|source| LedgerError::Malformed {
        path: path.to_string(),
        source,
    })
}

/// Serialize a ledger document as a compact JSON array.
pub fn encode<T: Serialize>(records: &[T]) -> Result<Vec<u8>, LedgerError> {
    Ok(serde_json::to_vec(records)?)
}

// ---------------------------------------------------------------------------
// 3. Upsert
// ---------------------------------------------------------------------------

/// Remove every record whose key matches `record`'s key, then append `record`.
///
/// Relative order of the remaining records is preserved.
pub fn upsert<T, K, F>(records: &mut Vec<T>, record: T, key: F)
where
    K: PartialEq,
    F: Fn(&T) -> K,
{
    let wanted = key(&record);
    records.retain(|existing| key(existing) != wanted);
    records.push(record);
}

/// [`upsert`] keyed by [`LedgerEntry::ledger_key`].
pub fn upsert_entry<T: LedgerEntry>(records: &mut Vec<T>, record: T) {
    upsert(records, record, |r| r.ledger_key().to_owned());
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
