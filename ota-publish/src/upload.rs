//! Plain file upload: local files to arbitrary remote paths.

use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use ota_store::{paths, RemoteStore};

use crate::error::PublishError;
use crate::publisher::check_local_file;
use crate::session::{RemoteAction, Session};

/// One `local file → remote path` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    pub source: PathBuf,
    pub destination: String,
}

/// Parses `SRC=DEST`.
impl FromStr for UploadItem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, destination) = s
            .split_once('=')
            .ok_or_else(|| format!("expected SRC=DEST, got '{s}'"))?;
        let destination = paths::normalize(destination);
        if source.is_empty() || destination.is_empty() {
            return Err(format!("expected SRC=DEST, got '{s}'"));
        }
        Ok(Self {
            source: PathBuf::from(source),
            destination,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    /// Public URL of each destination, in input order.
    pub urls: Vec<String>,
    pub actions: Vec<RemoteAction>,
}

/// Upload every item, creating each parent directory of a destination first.
///
/// All sources are checked before anything is uploaded.
pub fn upload_files<S: RemoteStore + ?Sized>(
    store: &mut S,
    items: &[UploadItem],
    dry_run: bool,
) -> Result<UploadReport, PublishError> {
    for item in items {
        check_local_file(&item.source)?;
    }

    let mut session = Session::new(store, dry_run);
    let mut urls = Vec::with_capacity(items.len());
    for item in items {
        for dir in paths::ancestors(&item.destination) {
            session.mkdir(&dir)?;
        }
        session.write_file(&item.destination, &item.source)?;
        urls.push(session.public_url(&item.destination));
    }
    Ok(UploadReport {
        urls,
        actions: session.into_actions(),
    })
}
