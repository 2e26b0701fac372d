//! `ota deploy`: publish one artifact.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;

use ota_publish::{DeployReport, DeployRequest, PublishOptions, Publisher, RemoteAction};
use ota_renderer::Renderer;

/// Arguments for `ota deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// The `.ipa` to publish.
    #[arg(env = "OTA_ARTIFACT")]
    pub artifact: PathBuf,

    /// Bundle identifier written into the install manifest.
    #[arg(long, env = "OTA_APP_IDENTIFIER")]
    pub app_identifier: String,

    /// Application display name; spaces become `_` in remote paths.
    #[arg(long, env = "OTA_APP_NAME")]
    pub name: String,

    #[arg(long, env = "OTA_BUILD_VERSION")]
    pub build_version: String,

    /// Release notes shown on the landing page.
    #[arg(long, env = "OTA_CHANGELOG")]
    pub changelog: Option<String>,

    /// Mark the project as single-page in the Projects ledger.
    #[arg(long, env = "OTA_SINGLE_PAGE")]
    pub single_page: bool,

    /// Show what would be uploaded without changing the remote store.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the full deploy report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Override `base_url` from the config file.
    #[arg(long)]
    pub base_url: Option<String>,
}

impl DeployArgs {
    pub fn run(self, config_path: &Path) -> Result<()> {
        let config = super::load_config(config_path, self.base_url.as_deref())?;
        let mut options = PublishOptions::from_config(&config);
        options.dry_run = self.dry_run;

        let renderer = Renderer::with_template_dir(config.template_dir.as_deref())
            .context("failed to load templates")?;
        let store = super::connect(&config)?;
        let mut publisher = Publisher::new(store, renderer, options);

        let request = DeployRequest {
            artifact: self.artifact,
            app_identifier: self.app_identifier,
            name: self.name,
            build_version: self.build_version,
            changelog: self.changelog.filter(|c| !c.trim().is_empty()),
            single_page: self.single_page,
            deployed_at: Local::now().naive_local(),
        };
        let report = publisher
            .deploy(&request)
            .with_context(|| format!("deploy of '{}' {} failed", request.name, request.build_version))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize deploy report")?
            );
        } else {
            print_report(&report);
        }
        Ok(())
    }
}

/// Action list, then the public URL as the last line.
pub(crate) fn print_actions(actions: &[RemoteAction]) {
    for action in actions {
        let path = if action.path().is_empty() { "/" } else { action.path() };
        match action {
            RemoteAction::Created(_) => println!("  {}  {path}", "+".green()),
            RemoteAction::Wrote(_) => println!("  {}  {path}", "✎".green()),
            RemoteAction::Deleted(_) => println!("  {}  {path}", "✗".red()),
            RemoteAction::Unchanged(_) => println!("  {}  {path}", "·".bright_black()),
            RemoteAction::WouldCreate(_)
            | RemoteAction::WouldWrite(_)
            | RemoteAction::WouldDelete(_) => println!("  {}  {action}", "~".yellow()),
        }
    }
}

fn print_report(report: &DeployReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };
    println!("{prefix}✓ deployed ({} remote actions)", report.actions.len());
    print_actions(&report.actions);
    println!("{}", report.public_url);
}
