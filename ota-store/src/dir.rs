//! Local directory backend, a filesystem tree served by a web server.
//!
//! Write flow: bytes → `<file>.ota.tmp` sibling → `rename`. The `.tmp` is
//! always in the target's directory (same filesystem, no EXDEV) and is
//! removed if the rename fails.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::paths;
use crate::{RemoteStore, StoreKind};

#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    base_url: String,
}

impl DirStore {
    pub fn new(root: PathBuf, base_url: impl Into<String>) -> Self {
        Self {
            root,
            base_url: base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        paths::normalize(path)
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
            .fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

fn not_found_or(path: &str, full: &Path, e: std::io::Error) -> StoreError {
    match e.kind() {
        std::io::ErrorKind::NotFound => StoreError::NotFound {
            path: path.to_string(),
        },
        std::io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
            path: path.to_string(),
            message: e.to_string(),
        },
        _ => io_err(full, e),
    }
}

impl RemoteStore for DirStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Dir
    }

    fn root_exists(&mut self) -> Result<bool, StoreError> {
        Ok(self.root.is_dir())
    }

    fn ensure_root(&mut self) -> Result<bool, StoreError> {
        if self.root_exists()? {
            return Ok(false);
        }
        std::fs::create_dir_all(&self.root).map_err(|e| io_err(&self.root, e))?;
        tracing::info!("created store root {}", self.root.display());
        Ok(true)
    }

    fn list(&mut self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        let dir = self.full_path(prefix);
        if !dir.is_dir() {
            return Ok(BTreeSet::new());
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| io_err(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".ota.tmp") {
                continue;
            }
            names.insert(name);
        }
        Ok(names)
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>, StoreError> {
        let full = self.full_path(path);
        std::fs::read(&full).map_err(|e| not_found_or(path, &full, e))
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let tmp = PathBuf::from(format!("{}.ota.tmp", full.display()));
        std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &full) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&full, e));
        }
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        let full = self.full_path(path);
        match std::fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(not_found_or(path, &full, e)),
        }
    }

    fn delete_tree(&mut self, path: &str) -> Result<(), StoreError> {
        let full = self.full_path(path);
        if full == self.root {
            return Err(StoreError::Config("refusing to delete the store root".into()));
        }
        if full.is_dir() {
            std::fs::remove_dir_all(&full).map_err(|e| io_err(&full, e))
        } else {
            self.delete(path)
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<(), StoreError> {
        let full = self.full_path(path);
        std::fs::create_dir_all(&full).map_err(|e| io_err(&full, e))
    }

    fn public_url(&self, path: &str) -> String {
        paths::public_url(&self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> DirStore {
        DirStore::new(tmp.path().join("www"), "https://h")
    }

    #[test]
    fn ensure_root_creates_once() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        assert!(s.ensure_root().unwrap());
        assert!(!s.ensure_root().unwrap());
        assert!(tmp.path().join("www").is_dir());
    }

    #[test]
    fn write_creates_parents_and_cleans_tmp() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        s.write("Foo/2024-01-01/Foo.plist", b"<plist/>").unwrap();
        let full = tmp.path().join("www/Foo/2024-01-01/Foo.plist");
        assert_eq!(std::fs::read(&full).unwrap(), b"<plist/>");
        let tmp_file = PathBuf::from(format!("{}.ota.tmp", full.display()));
        assert!(!tmp_file.exists(), ".ota.tmp must be gone after write");
    }

    #[test]
    fn read_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        assert!(s.read("projects.json").unwrap_err().is_not_found());
    }

    #[test]
    fn list_shows_files_and_dirs() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        s.write("projects.json", b"[]").unwrap();
        s.mkdir("Foo").unwrap();
        let names: Vec<_> = s.list("").unwrap().into_iter().collect();
        assert_eq!(names, vec!["Foo", "projects.json"]);
        assert!(s.list("Missing").unwrap().is_empty());
    }

    #[test]
    fn delete_tree_and_delete_are_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        s.write("Foo/2024-01-01/Foo.ipa", b"ipa").unwrap();
        s.delete_tree("Foo/2024-01-01").unwrap();
        s.delete_tree("Foo/2024-01-01").unwrap();
        s.delete("Foo/missing.txt").unwrap();
        assert!(s.list("Foo").unwrap().is_empty());
    }

    #[test]
    fn delete_tree_refuses_root() {
        let tmp = TempDir::new().unwrap();
        let mut s = store(&tmp);
        s.ensure_root().unwrap();
        assert!(matches!(s.delete_tree(""), Err(StoreError::Config(_))));
    }
}
