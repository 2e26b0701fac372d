//! Error types for ota-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from decoding or encoding a ledger document.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Remote content is not a JSON array of the expected objects.
    /// Never auto-repaired.
    #[error("malformed ledger at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization error (persist path).
    #[error("ledger serialization error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors from loading or validating the publisher configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure reading the config file.
    #[error("cannot read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error, with file path and serde_yaml line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A field is present but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}
