//! Fetch/persist half of the ledger protocol.
//!
//! A ledger is read into a [`Snapshot`], modified in memory and written back
//! whole. The snapshot remembers the SHA-256 of the bytes it was read from so
//! that [`persist_ledger`] can
//!
//! - skip the write when nothing changed, and
//! - with `verify` on, re-read the remote document first and refuse to
//!   overwrite it if someone else changed it in the meantime.
//!
//! The re-read narrows the lost-update window but does not close it: there is
//! no compare-and-swap on FTP or plain S3.

use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

use ota_core::ledger;
use ota_store::{RemoteStore, StoreError};

use crate::error::PublishError;
use crate::session::Session;

/// Hex SHA-256 of `bytes`.
pub fn digest(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// A decoded ledger plus what it was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub path: String,
    pub records: Vec<T>,
    /// `None` when the ledger did not exist.
    pub digest: Option<String>,
}

fn read_optional<S: RemoteStore + ?Sized>(
    store: &mut S,
    path: &str,
) -> Result<Option<Vec<u8>>, StoreError> {
    match store.read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read and decode the ledger at `path`. A missing ledger is empty.
pub fn fetch_ledger<S, T>(store: &mut S, path: &str) -> Result<Snapshot<T>, PublishError>
where
    S: RemoteStore + ?Sized,
    T: DeserializeOwned,
{
    tracing::debug!("fetching ledger {path}");
    match read_optional(store, path)? {
        Some(bytes) => Ok(Snapshot {
            path: path.to_string(),
            records: ledger::decode(path, &bytes)?,
            digest: Some(digest(&bytes)),
        }),
        None => {
            tracing::warn!("ledger {path} not found, starting empty");
            Ok(Snapshot {
                path: path.to_string(),
                records: Vec::new(),
                digest: None,
            })
        }
    }
}

/// Encode `snapshot.records` and write them back to `snapshot.path`.
pub fn persist_ledger<S, T>(
    session: &mut Session<'_, S>,
    snapshot: &Snapshot<T>,
    verify: bool,
) -> Result<(), PublishError>
where
    S: RemoteStore + ?Sized,
    T: Serialize,
{
    let bytes = ledger::encode(&snapshot.records)?;
    if snapshot.digest.as_deref() == Some(digest(&bytes).as_str()) {
        session.unchanged(&snapshot.path);
        return Ok(());
    }

    if verify {
        let current = read_optional(session.store(), &snapshot.path)?;
        let current_digest = current.as_deref().map(digest);
        if current_digest != snapshot.digest {
            return Err(PublishError::LedgerConflict {
                path: snapshot.path.clone(),
            });
        }
    }

    session.write(&snapshot.path, &bytes)
}
