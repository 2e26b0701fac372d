//! ota core library: ledger records, ledger codec, configuration and errors.
//!
//! - [`types`]: newtypes and ledger records
//! - [`ledger`]: remote layout, JSON codec, upsert
//! - [`config`]: `ota.yaml`
//! - [`error`]: [`LedgerError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod ledger;
pub mod types;

pub use config::{BackendConfig, DirConfig, FtpConfig, PublisherConfig, S3Config};
pub use error::{ConfigError, LedgerError};
pub use types::{AppName, Build, BuildFolder, LedgerEntry, Project};
