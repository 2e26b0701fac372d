//! `ota upload`: copy local files to remote paths.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use ota_publish::{upload_files, UploadItem};

/// Arguments for `ota upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Files to upload as `local/path=remote/path`.
    #[arg(required = true, value_name = "SRC=DEST")]
    pub items: Vec<UploadItem>,

    /// Show what would be uploaded without changing the remote store.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the upload report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl UploadArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path, None)?;
        let mut store = super::connect(&config)?;
        let report = upload_files(&mut store, &self.items, self.dry_run).context("upload failed")?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize upload report")?
            );
            return Ok(());
        }

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        println!("{prefix}✓ uploaded {} file(s)", self.items.len());
        super::deploy::print_actions(&report.actions);
        for url in &report.urls {
            println!("{url}");
        }
        Ok(())
    }
}
