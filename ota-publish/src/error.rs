//! Error types for ota-publish.

use std::path::PathBuf;

use thiserror::Error;

use ota_core::LedgerError;
use ota_renderer::RenderError;
use ota_store::StoreError;

/// All errors that can arise while deploying or uploading.
#[derive(Debug, Error)]
pub enum PublishError {
    /// A remote store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A ledger document could not be decoded or encoded.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// The remote ledger changed between fetch and persist.
    #[error("ledger {path} was modified by someone else during this deploy; retry")]
    LedgerConflict { path: String },

    /// The local artifact does not exist or is not a regular file.
    #[error("artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// The display name does not slug to a single safe path segment.
    #[error("invalid app name '{name}': must not be empty, '.', '..' or contain path separators")]
    InvalidName { name: String },

    /// The artifact would be overwritten by a generated document of the same
    /// remote path.
    #[error("artifact {path} clashes with the generated manifest or landing page; rename it")]
    ArtifactNameClash { path: String },

    /// `uploaded_at_format` is not a usable strftime pattern.
    #[error("invalid uploaded_at format '{format}'")]
    InvalidFormat { format: String },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`PublishError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PublishError {
    PublishError::Io {
        path: path.into(),
        source,
    }
}
