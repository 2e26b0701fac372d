//! In-process store with object-store semantics.
//!
//! There are no directories: a "directory" exists exactly when some key
//! starts with `<dir>/`. Used by tests and dry local experiments.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::StoreError;
use crate::paths;
use crate::{RemoteStore, StoreKind};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: BTreeMap<String, Vec<u8>>,
    base_url: String,
    root_exists: bool,
}

impl MemoryStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            objects: BTreeMap::new(),
            base_url: base_url.into(),
            root_exists: false,
        }
    }

    /// Borrow an object's content.
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.objects.get(&paths::normalize(path)).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.contains_key(&paths::normalize(path))
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.objects.keys().cloned().collect()
    }

    /// Put an object directly, bypassing the [`RemoteStore`] interface.
    pub fn insert(&mut self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.root_exists = true;
        self.objects.insert(paths::normalize(path), bytes.into());
    }
}

impl RemoteStore for MemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    fn root_exists(&mut self) -> Result<bool, StoreError> {
        Ok(self.root_exists)
    }

    fn ensure_root(&mut self) -> Result<bool, StoreError> {
        let created = !self.root_exists;
        self.root_exists = true;
        Ok(created)
    }

    fn list(&mut self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        let prefix = paths::normalize(prefix);
        let scope = if prefix.is_empty() { String::new() } else { format!("{prefix}/") };
        Ok(self
            .objects
            .keys()
            .filter_map(|key| key.strip_prefix(scope.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>, StoreError> {
        let key = paths::normalize(path);
        self.objects
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound { path: key })
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.insert(path, bytes);
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        self.objects.remove(&paths::normalize(path));
        Ok(())
    }

    fn delete_tree(&mut self, path: &str) -> Result<(), StoreError> {
        let key = paths::normalize(path);
        let scope = format!("{key}/");
        self.objects
            .retain(|k, _| k != &key && !k.starts_with(scope.as_str()));
        Ok(())
    }

    fn mkdir(&mut self, _path: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        paths::public_url(&self.base_url, path)
    }
}
