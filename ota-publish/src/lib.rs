//! # ota-publish
//!
//! Deployment orchestration on top of a [`RemoteStore`](ota_store::RemoteStore).
//!
//! Call [`Publisher::deploy`] to publish one artifact with its manifest,
//! landing page and ledger updates, or [`upload_files`] for plain uploads.

pub mod error;
pub mod ledger;
pub mod publisher;
pub mod session;
pub mod upload;

pub use error::PublishError;
pub use ledger::{fetch_ledger, persist_ledger, Snapshot};
pub use publisher::{DeployReport, DeployRequest, PublishOptions, Publisher};
pub use session::{RemoteAction, Session};
pub use upload::{upload_files, UploadItem, UploadReport};
