//! `ota ledger`: read-only view of the remote ledgers.

use std::path::Path;

use anyhow::{ensure, Context, Result};
use clap::Subcommand;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use ota_core::ledger::{builds_path, PROJECTS_FILE};
use ota_core::{AppName, Build, Project};
use ota_publish::fetch_ledger;

#[derive(Subcommand, Debug)]
pub enum LedgerCommand {
    /// One row per published application.
    Projects {
        /// Emit the raw ledger as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Every build of one application.
    Builds {
        /// Application display name.
        name: String,

        /// Emit the raw ledger as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "name")]
    name: String,
    #[tabled(rename = "identifier")]
    app_identifier: String,
    #[tabled(rename = "version")]
    build_version: String,
    #[tabled(rename = "uploaded")]
    uploaded_at: String,
    #[tabled(rename = "url")]
    url: String,
}

#[derive(Tabled)]
struct BuildRow {
    #[tabled(rename = "version")]
    build_version: String,
    #[tabled(rename = "uploaded")]
    uploaded_at: String,
    #[tabled(rename = "manifest")]
    plist_url: String,
}

pub fn run(command: LedgerCommand, config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path, None)?;
    let mut store = super::connect(&config)?;

    match command {
        LedgerCommand::Projects { json } => {
            let snapshot = fetch_ledger::<_, Project>(&mut store, PROJECTS_FILE)
                .context("failed to read the Projects ledger")?;
            if json {
                return print_json(&snapshot.records);
            }
            println!("{} {}", "Projects".bold(), format!("({})", snapshot.records.len()).bright_black());
            if snapshot.records.is_empty() {
                println!("No projects published yet.");
                return Ok(());
            }
            let rows: Vec<ProjectRow> = snapshot
                .records
                .into_iter()
                .map(|p| ProjectRow {
                    url: p.html_url.unwrap_or(p.plist_url),
                    name: p.name,
                    app_identifier: p.app_identifier,
                    build_version: p.build_version,
                    uploaded_at: p.uploaded_at,
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
        LedgerCommand::Builds { name, json } => {
            let app = AppName::from_display(&name);
            ensure!(app.is_path_safe(), "invalid app name '{name}'");
            let path = builds_path(&app);
            let snapshot = fetch_ledger::<_, Build>(&mut store, &path)
                .with_context(|| format!("failed to read the Builds ledger of '{app}'"))?;
            if json {
                return print_json(&snapshot.records);
            }
            println!("{} {}", app.as_str().bold(), format!("({} builds)", snapshot.records.len()).bright_black());
            if snapshot.records.is_empty() {
                println!("No builds published for '{app}'.");
                return Ok(());
            }
            let rows: Vec<BuildRow> = snapshot
                .records
                .into_iter()
                .map(|b| BuildRow {
                    build_version: b.build_version,
                    uploaded_at: b.uploaded_at,
                    plist_url: b.plist_url,
                })
                .collect();
            let mut table = Table::new(rows);
            table.with(Style::rounded());
            println!("{table}");
        }
    }
    Ok(())
}

fn print_json<T: serde::Serialize>(records: &[T]) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(records).context("failed to serialize ledger JSON")?
    );
    Ok(())
}
