//! Error types for ota-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors a [`crate::RemoteStore`] backend may report.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cannot reach or authenticate to the remote store. Fatal.
    #[error("cannot connect to {target}: {message}")]
    Connection { target: String, message: String },

    /// The blob or directory does not exist.
    #[error("not found: {path}")]
    NotFound { path: String },

    /// The resource exists but is not accessible with the given credentials.
    #[error("permission denied for {path}: {message}")]
    PermissionDenied { path: String, message: String },

    /// The store answered with an unexpected failure.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// Local filesystem failure (directory backend or reading an artifact).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Backend configuration cannot be turned into a client.
    #[error("invalid store configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
