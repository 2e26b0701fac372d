//! # ota-store
//!
//! The [`RemoteStore`] capability set, a bucket of named blobs reachable by
//! path, and its backends:
//!
//! | Backend       | Module     | Directories                        |
//! |---------------|------------|------------------------------------|
//! | FTP           | [`ftp`]    | real, created per segment          |
//! | S3            | [`s3`]     | key prefixes only, `mkdir` no-op   |
//! | Local dir     | [`dir`]    | real, created on demand            |
//! | In-memory     | [`memory`] | key prefixes only, `mkdir` no-op   |
//!
//! Paths are `/`-separated and relative to the store root. Callers must not
//! assume a directory exists unless an object was written below it.

pub mod dir;
pub mod error;
pub mod ftp;
pub mod memory;
pub mod paths;
pub mod s3;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use ota_core::{config::PublisherConfig, BackendConfig};

pub use dir::DirStore;
pub use error::StoreError;
pub use ftp::FtpStore;
pub use memory::MemoryStore;
pub use s3::S3Store;

/// Which backend a store is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Ftp,
    S3,
    Dir,
    Memory,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Ftp => write!(f, "ftp"),
            StoreKind::S3 => write!(f, "s3"),
            StoreKind::Dir => write!(f, "dir"),
            StoreKind::Memory => write!(f, "memory"),
        }
    }
}

/// Backend-agnostic remote storage.
///
/// Every call blocks until the remote operation completes.
pub trait RemoteStore {
    fn kind(&self) -> StoreKind;

    /// Whether the root container exists. Never creates anything.
    fn root_exists(&mut self) -> Result<bool, StoreError>;

    /// Make sure the root container exists. Returns `true` if it was created.
    fn ensure_root(&mut self) -> Result<bool, StoreError>;

    /// Names immediately under `prefix` (`""` = root). Missing prefix → empty.
    fn list(&mut self, prefix: &str) -> Result<BTreeSet<String>, StoreError>;

    /// Read a whole blob. [`StoreError::NotFound`] if absent.
    fn read(&mut self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Create or overwrite a blob, publicly readable where supported.
    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Upload a local file.
    fn write_file(&mut self, path: &str, local: &Path) -> Result<(), StoreError> {
        let bytes = std::fs::read(local).map_err(|e| error::io_err(local, e))?;
        self.write(path, &bytes)
    }

    /// Delete one blob; absent is a no-op.
    fn delete(&mut self, path: &str) -> Result<(), StoreError>;

    /// Delete everything under `path`; absent is a no-op.
    fn delete_tree(&mut self, path: &str) -> Result<(), StoreError>;

    /// Create `path` and its missing parents. No-op for object stores.
    fn mkdir(&mut self, path: &str) -> Result<(), StoreError>;

    /// Externally reachable URL for `path`.
    fn public_url(&self, path: &str) -> String;
}

impl<S: RemoteStore + ?Sized> RemoteStore for Box<S> {
    fn kind(&self) -> StoreKind {
        (**self).kind()
    }
    fn root_exists(&mut self) -> Result<bool, StoreError> {
        (**self).root_exists()
    }
    fn ensure_root(&mut self) -> Result<bool, StoreError> {
        (**self).ensure_root()
    }
    fn list(&mut self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        (**self).list(prefix)
    }
    fn read(&mut self, path: &str) -> Result<Vec<u8>, StoreError> {
        (**self).read(path)
    }
    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).write(path, bytes)
    }
    fn write_file(&mut self, path: &str, local: &Path) -> Result<(), StoreError> {
        (**self).write_file(path, local)
    }
    fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        (**self).delete(path)
    }
    fn delete_tree(&mut self, path: &str) -> Result<(), StoreError> {
        (**self).delete_tree(path)
    }
    fn mkdir(&mut self, path: &str) -> Result<(), StoreError> {
        (**self).mkdir(path)
    }
    fn public_url(&self, path: &str) -> String {
        (**self).public_url(path)
    }
}

impl<S: RemoteStore + ?Sized> RemoteStore for &mut S {
    fn kind(&self) -> StoreKind {
        (**self).kind()
    }
    fn root_exists(&mut self) -> Result<bool, StoreError> {
        (**self).root_exists()
    }
    fn ensure_root(&mut self) -> Result<bool, StoreError> {
        (**self).ensure_root()
    }
    fn list(&mut self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        (**self).list(prefix)
    }
    fn read(&mut self, path: &str) -> Result<Vec<u8>, StoreError> {
        (**self).read(path)
    }
    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).write(path, bytes)
    }
    fn write_file(&mut self, path: &str, local: &Path) -> Result<(), StoreError> {
        (**self).write_file(path, local)
    }
    fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        (**self).delete(path)
    }
    fn delete_tree(&mut self, path: &str) -> Result<(), StoreError> {
        (**self).delete_tree(path)
    }
    fn mkdir(&mut self, path: &str) -> Result<(), StoreError> {
        (**self).mkdir(path)
    }
    fn public_url(&self, path: &str) -> String {
        (**self).public_url(path)
    }
}

/// Connect to the backend selected by `config.backend`.
pub fn open(config: &PublisherConfig) -> Result<Box<dyn RemoteStore>, StoreError> {
    let base_url = config.public_base_url();
    let store: Box<dyn RemoteStore> = match &config.backend {
        BackendConfig::Ftp(ftp) => Box::new(FtpStore::connect(ftp, base_url)?),
        BackendConfig::S3(s3) => Box::new(S3Store::new(s3, base_url)?),
        BackendConfig::Dir(dir) => Box::new(DirStore::new(dir.path.clone(), base_url)),
    };
    tracing::debug!(kind = %store.kind(), "remote store ready");
    Ok(store)
}
