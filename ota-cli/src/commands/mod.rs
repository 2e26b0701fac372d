//! Subcommands and the config/connection plumbing they share.

pub mod deploy;
pub mod ledger;
pub mod upload;

use std::path::Path;

use anyhow::{Context, Result};

use ota_core::PublisherConfig;
use ota_store::RemoteStore;

/// Load `path`, fill secrets from the environment and apply CLI overrides.
pub(crate) fn load_config(path: &Path, base_url: Option<&str>) -> Result<PublisherConfig> {
    let mut config = PublisherConfig::load(path)
        .with_context(|| format!("failed to load config {}", path.display()))?;
    config.apply_env();
    tracing::debug!("loaded config {}", path.display());
    if let Some(url) = base_url {
        config.base_url = url.to_string();
        config.validate().context("invalid --base-url")?;
    }
    Ok(config)
}

/// Open the configured backend.
pub(crate) fn connect(config: &PublisherConfig) -> Result<Box<dyn RemoteStore>> {
    ota_store::open(config).context("could not connect to the remote store")
}
