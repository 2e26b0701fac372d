//! A store borrowed for one run, with every mutation recorded.
//!
//! Reads go straight to the store through [`Session::store`]. Mutations go
//! through the session so they land in the action log, and in dry-run mode
//! they are only recorded as `Would*` actions.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use ota_store::RemoteStore;

use crate::error::PublishError;

/// One step taken (or that would be taken) against the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "path", rename_all = "snake_case")]
pub enum RemoteAction {
    /// Directory or root container created.
    Created(String),
    /// Blob written.
    Wrote(String),
    /// Blob or subtree deleted.
    Deleted(String),
    /// Ledger write skipped because its content did not change.
    Unchanged(String),
    WouldCreate(String),
    WouldWrite(String),
    WouldDelete(String),
}

impl RemoteAction {
    pub fn path(&self) -> &str {
        match self {
            RemoteAction::Created(p)
            | RemoteAction::Wrote(p)
            | RemoteAction::Deleted(p)
            | RemoteAction::Unchanged(p)
            | RemoteAction::WouldCreate(p)
            | RemoteAction::WouldWrite(p)
            | RemoteAction::WouldDelete(p) => p,
        }
    }

    /// `true` for actions that changed the remote store.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            RemoteAction::Created(_) | RemoteAction::Wrote(_) | RemoteAction::Deleted(_)
        )
    }
}

impl fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self {
            RemoteAction::Created(_) => "created",
            RemoteAction::Wrote(_) => "wrote",
            RemoteAction::Deleted(_) => "deleted",
            RemoteAction::Unchanged(_) => "unchanged",
            RemoteAction::WouldCreate(_) => "would create",
            RemoteAction::WouldWrite(_) => "would write",
            RemoteAction::WouldDelete(_) => "would delete",
        };
        let path = self.path();
        write!(f, "{verb}: {}", if path.is_empty() { "/" } else { path })
    }
}

pub struct Session<'s, S: RemoteStore + ?Sized> {
    store: &'s mut S,
    dry_run: bool,
    log: Vec<RemoteAction>,
}

impl<'s, S: RemoteStore + ?Sized> Session<'s, S> {
    pub fn new(store: &'s mut S, dry_run: bool) -> Self {
        Self {
            store,
            dry_run,
            log: Vec::new(),
        }
    }

    /// Direct access for reads and listings.
    pub fn store(&mut self) -> &mut S {
        &mut *self.store
    }

    pub fn public_url(&self, path: &str) -> String {
        self.store.public_url(path)
    }

    pub fn into_actions(self) -> Vec<RemoteAction> {
        self.log
    }

    fn record(&mut self, action: RemoteAction) {
        if self.dry_run {
            tracing::info!("[dry-run] {action}");
        } else if action.is_mutation() {
            tracing::info!("{action}");
        } else {
            tracing::debug!("{action}");
        }
        self.log.push(action);
    }

    /// Create the root container. Returns `true` if it was (or in a dry run
    /// would be) created.
    pub fn ensure_root(&mut self) -> Result<bool, PublishError> {
        if self.dry_run {
            if self.store.root_exists()? {
                return Ok(false);
            }
            self.record(RemoteAction::WouldCreate(String::new()));
            return Ok(true);
        }
        let created = self.store.ensure_root()?;
        if created {
            self.record(RemoteAction::Created(String::new()));
        }
        Ok(created)
    }

    pub fn mkdir(&mut self, path: &str) -> Result<(), PublishError> {
        if self.dry_run {
            self.record(RemoteAction::WouldCreate(path.to_string()));
            return Ok(());
        }
        self.store.mkdir(path)?;
        self.record(RemoteAction::Created(path.to_string()));
        Ok(())
    }

    pub fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), PublishError> {
        if self.dry_run {
            self.record(RemoteAction::WouldWrite(path.to_string()));
            return Ok(());
        }
        self.store.write(path, bytes)?;
        self.record(RemoteAction::Wrote(path.to_string()));
        Ok(())
    }

    pub fn write_file(&mut self, path: &str, local: &Path) -> Result<(), PublishError> {
        if self.dry_run {
            self.record(RemoteAction::WouldWrite(path.to_string()));
            return Ok(());
        }
        self.store.write_file(path, local)?;
        self.record(RemoteAction::Wrote(path.to_string()));
        Ok(())
    }

    pub fn delete_tree(&mut self, path: &str) -> Result<(), PublishError> {
        if self.dry_run {
            self.record(RemoteAction::WouldDelete(path.to_string()));
            return Ok(());
        }
        self.store.delete_tree(path)?;
        self.record(RemoteAction::Deleted(path.to_string()));
        Ok(())
    }

    pub fn unchanged(&mut self, path: &str) {
        self.record(RemoteAction::Unchanged(path.to_string()));
    }
}
