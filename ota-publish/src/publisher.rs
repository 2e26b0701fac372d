//! Deployment orchestration.
//!
//! ## `Publisher::deploy`: 9-step protocol
//!
//! 1. Connect (done by the caller when it builds the store).
//! 2. Bootstrap root: root container, `projects.json`, `index.html`.
//! 3. Bootstrap app: `<app>/` and `<app>/builds.json`.
//! 4. Stage build folder: replace `<app>/<YYYY-MM-DD>/` if it exists.
//! 5. Upload the artifact.
//! 6. Render and upload the install manifest and landing page.
//! 7. Upsert the Builds ledger (key `uploaded_at`).
//! 8. Upsert the Projects ledger (key `name`).
//! 9. Report the public URLs.
//!
//! Every store error aborts the remaining steps. Nothing is rolled back.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use ota_core::config::DEFAULT_UPLOADED_AT_FORMAT;
use ota_core::ledger::{self, INDEX_FILE, PROJECTS_FILE};
use ota_core::{AppName, Build, BuildFolder, Project, PublisherConfig};
use ota_renderer::{LandingContext, ManifestContext, Renderer};
use ota_store::RemoteStore;

use crate::error::{io_err, PublishError};
use crate::ledger::{fetch_ledger, persist_ledger};
use crate::session::{RemoteAction, Session};

const EMPTY_LEDGER: &[u8] = b"[]";

// ---------------------------------------------------------------------------
// Options, request, report
// ---------------------------------------------------------------------------

/// Behaviour switches for a [`Publisher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub uploaded_at_format: String,
    pub landing_pages: bool,
    pub index_page: bool,
    pub verify_ledgers: bool,
    pub dry_run: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            uploaded_at_format: DEFAULT_UPLOADED_AT_FORMAT.to_string(),
            landing_pages: true,
            index_page: true,
            verify_ledgers: true,
            dry_run: false,
        }
    }
}

impl PublishOptions {
    pub fn from_config(config: &PublisherConfig) -> Self {
        Self {
            uploaded_at_format: config.uploaded_at_format.clone(),
            landing_pages: config.landing_pages(),
            index_page: config.index_page(),
            verify_ledgers: config.verify_ledgers,
            dry_run: false,
        }
    }
}

/// One artifact to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    /// Local `.ipa`.
    pub artifact: PathBuf,
    pub app_identifier: String,
    /// Display name; slugged into the [`AppName`].
    pub name: String,
    pub build_version: String,
    pub changelog: Option<String>,
    pub single_page: bool,
    /// Local wall-clock time of the deployment.
    pub deployed_at: NaiveDateTime,
}

/// What a deploy published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployReport {
    /// The URL to hand to testers: index page, else landing page, else manifest.
    pub public_url: String,
    pub artifact_url: String,
    pub manifest_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_url: Option<String>,
    pub dry_run: bool,
    pub actions: Vec<RemoteAction>,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Every remote path and derived value of one deploy, computed up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeployPlan {
    pub app: AppName,
    pub folder: BuildFolder,
    pub folder_path: String,
    pub artifact_path: String,
    pub manifest_path: String,
    pub landing_path: Option<String>,
    pub builds_path: String,
    pub uploaded_at: String,
}

fn format_timestamp(at: &NaiveDateTime, format: &str) -> Result<String, PublishError> {
    let mut out = String::new();
    write!(out, "{}", at.format(format)).map_err(|_| PublishError::InvalidFormat {
        format: format.to_string(),
    })?;
    Ok(out)
}

impl DeployPlan {
    pub(crate) fn new(request: &DeployRequest, options: &PublishOptions) -> Result<Self, PublishError> {
        let artifact = request.artifact.as_path();
        let (Some(file_name), Some(stem)) = (artifact.file_name(), artifact.file_stem()) else {
            return Err(PublishError::ArtifactMissing {
                path: request.artifact.clone(),
            });
        };
        let file_name = file_name.to_string_lossy();
        let stem = stem.to_string_lossy();

        let app = AppName::from_display(&request.name);
        if !app.is_path_safe() {
            return Err(PublishError::InvalidName {
                name: request.name.clone(),
            });
        }
        let folder = BuildFolder::for_date(request.deployed_at.date());
        let landing_path = options
            .landing_pages
            .then(|| ledger::build_file_path(&app, &folder, &format!("{stem}.html")));

        let artifact_path = ledger::build_file_path(&app, &folder, &file_name);
        let manifest_path = ledger::build_file_path(&app, &folder, &format!("{stem}.plist"));
        if artifact_path == manifest_path || landing_path.as_deref() == Some(artifact_path.as_str()) {
            return Err(PublishError::ArtifactNameClash {
                path: artifact_path,
            });
        }

        Ok(Self {
            folder_path: ledger::build_folder_path(&app, &folder),
            artifact_path,
            manifest_path,
            landing_path,
            builds_path: ledger::builds_path(&app),
            uploaded_at: format_timestamp(&request.deployed_at, &options.uploaded_at_format)?,
            app,
            folder,
        })
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Deploys artifacts into one remote store.
pub struct Publisher<S: RemoteStore> {
    store: S,
    renderer: Renderer,
    options: PublishOptions,
}

impl<S: RemoteStore> Publisher<S> {
    pub fn new(store: S, renderer: Renderer, options: PublishOptions) -> Self {
        Self {
            store,
            renderer,
            options,
        }
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Run the full deployment protocol for `request`.
    pub fn deploy(&mut self, request: &DeployRequest) -> Result<DeployReport, PublishError> {
        check_local_file(&request.artifact)?;
        let plan = DeployPlan::new(request, &self.options)?;
        tracing::info!(
            app = %plan.app,
            version = %request.build_version,
            folder = %plan.folder,
            "deploying {}",
            request.artifact.display()
        );

        let options = &self.options;
        let renderer = &self.renderer;
        let mut session = Session::new(&mut self.store, options.dry_run);

        let root_listing = bootstrap_root(&mut session, renderer, options)?;
        let app_existed = bootstrap_app(&mut session, &plan, &root_listing)?;
        stage_build_folder(&mut session, &plan, app_existed)?;

        session.write_file(&plan.artifact_path, &request.artifact)?;
        let artifact_url = session.public_url(&plan.artifact_path);

        let manifest = renderer.render_manifest(&ManifestContext {
            url: artifact_url.clone(),
            bundle_identifier: request.app_identifier.clone(),
            bundle_version: request.build_version.clone(),
            title: request.name.clone(),
        })?;
        session.write(&plan.manifest_path, manifest.as_bytes())?;
        let manifest_url = session.public_url(&plan.manifest_path);

        let landing_url = match &plan.landing_path {
            Some(path) => {
                let html = renderer.render_landing(&LandingContext {
                    manifest_url: manifest_url.clone(),
                    name: request.name.clone(),
                    bundle_version: request.build_version.clone(),
                    changelog: request.changelog.clone(),
                    uploaded_at: plan.uploaded_at.clone(),
                })?;
                session.write(path, html.as_bytes())?;
                Some(session.public_url(path))
            }
            None => None,
        };

        let mut builds = fetch_ledger::<_, Build>(session.store(), &plan.builds_path)?;
        ledger::upsert_entry(
            &mut builds.records,
            Build {
                build_version: request.build_version.clone(),
                uploaded_at: plan.uploaded_at.clone(),
                plist_url: manifest_url.clone(),
                extra: Default::default(),
            },
        );
        persist_ledger(&mut session, &builds, options.verify_ledgers)?;

        let mut projects = fetch_ledger::<_, Project>(session.store(), PROJECTS_FILE)?;
        ledger::upsert_entry(
            &mut projects.records,
            Project {
                app_identifier: request.app_identifier.clone(),
                name: plan.app.as_str().to_string(),
                build_version: request.build_version.clone(),
                uploaded_at: plan.uploaded_at.clone(),
                plist_url: manifest_url.clone(),
                html_url: landing_url.clone(),
                single_page: request.single_page,
                extra: Default::default(),
            },
        );
        persist_ledger(&mut session, &projects, options.verify_ledgers)?;

        let index_url = options.index_page.then(|| session.public_url(INDEX_FILE));
        let public_url = index_url
            .clone()
            .or_else(|| landing_url.clone())
            .unwrap_or_else(|| manifest_url.clone());

        let report = DeployReport {
            public_url,
            artifact_url,
            manifest_url,
            landing_url,
            index_url,
            dry_run: options.dry_run,
            actions: session.into_actions(),
        };
        tracing::info!("deployed {} {}", plan.app, request.build_version);
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// The artifact must exist and be a regular file.
pub(crate) fn check_local_file(path: &Path) -> Result<(), PublishError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(PublishError::ArtifactMissing { path: path.to_path_buf() }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PublishError::ArtifactMissing { path: path.to_path_buf() })
        }
        Err(e) => Err(io_err(path, e)),
    }
}

/// Step 2. Returns the root listing as it was before bootstrapping; a root
/// that was just created (or would be) is not listed.
fn bootstrap_root<S: RemoteStore + ?Sized>(
    session: &mut Session<'_, S>,
    renderer: &Renderer,
    options: &PublishOptions,
) -> Result<BTreeSet<String>, PublishError> {
    let created = session.ensure_root()?;
    let listing = if created {
        BTreeSet::new()
    } else {
        session.store().list("")?
    };
    tracing::debug!("store root has {} entries", listing.len());

    if !listing.contains(PROJECTS_FILE) {
        session.write(PROJECTS_FILE, EMPTY_LEDGER)?;
    }
    if options.index_page && (created || !listing.contains(INDEX_FILE)) {
        let html = renderer.render_index()?;
        session.write(INDEX_FILE, html.as_bytes())?;
    }
    Ok(listing)
}

/// Step 3. Returns whether the app folder already existed.
fn bootstrap_app<S: RemoteStore + ?Sized>(
    session: &mut Session<'_, S>,
    plan: &DeployPlan,
    root_listing: &BTreeSet<String>,
) -> Result<bool, PublishError> {
    if root_listing.contains(plan.app.as_str()) {
        return Ok(true);
    }
    session.mkdir(plan.app.as_str())?;
    session.write(&plan.builds_path, EMPTY_LEDGER)?;
    Ok(false)
}

/// Step 4.
fn stage_build_folder<S: RemoteStore + ?Sized>(
    session: &mut Session<'_, S>,
    plan: &DeployPlan,
    app_existed: bool,
) -> Result<(), PublishError> {
    if app_existed && session.store().list(plan.app.as_str())?.contains(plan.folder.as_str()) {
        tracing::info!("replacing existing build folder {}", plan.folder_path);
        session.delete_tree(&plan.folder_path)?;
    }
    session.mkdir(&plan.folder_path)
}
