//! Domain types for the deployment ledgers.
//!
//! Field names of [`Project`] and [`Build`] are the wire contract read by
//! dashboards; they must not be renamed.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Remote-safe application name: the display name with spaces replaced by `_`.
///
/// Used both as the app folder name and as the Projects ledger key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppName(pub String);

impl AppName {
    /// Slug a human-readable display name.
    pub fn from_display(name: &str) -> Self {
        Self(name.trim().replace(' ', "_"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Usable as one remote path segment: non-empty, no separators or
    /// control characters, not `.` or `..`.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.chars().any(|c| c == '/' || c == '\\' || c.is_control())
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for AppName {
    fn from(s: String) -> Self {
        Self::from_display(&s)
    }
}

impl From<&str> for AppName {
    fn from(s: &str) -> Self {
        Self::from_display(s)
    }
}

/// Name of a per-deployment folder: the deployment date as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildFolder(pub String);

impl BuildFolder {
    pub fn for_date(date: NaiveDate) -> Self {
        Self(date.format("%Y-%m-%d").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ---------------------------------------------------------------------------
// Ledger records
// ---------------------------------------------------------------------------

/// A record stored in a ledger document, identified by a logical key.
pub trait LedgerEntry {
    /// Value compared by [`crate::ledger::upsert_entry`].
    fn ledger_key(&self) -> &str;
}

/// One row per application in `projects.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub app_identifier: String,
    pub name: String,
    pub build_version: String,
    pub uploaded_at: String,
    pub plist_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    #[serde(default)]
    pub single_page: bool,
    /// Fields written by other tools; kept untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LedgerEntry for Project {
    fn ledger_key(&self) -> &str {
        &self.name
    }
}

/// One row per deployed build in `<app_name>/builds.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub build_version: String,
    pub uploaded_at: String,
    pub plist_url: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl LedgerEntry for Build {
    fn ledger_key(&self) -> &str {
        &self.uploaded_at
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_replaces_spaces() {
        assert_eq!(AppName::from("My Cool App").as_str(), "My_Cool_App");
        assert_eq!(AppName::from(String::from(" Foo ")).to_string(), "Foo");
    }

    #[test]
    fn path_safety() {
        assert!(AppName::from("My App").is_path_safe());
        assert!(AppName::from("App.v2").is_path_safe());
        for name in ["", "   ", ".", "..", "../Other", "a/b", "a\\b", "tab\there"] {
            assert!(!AppName::from(name).is_path_safe(), "{name:?} must be rejected");
        }
    }

    #[test]
    fn build_folder_is_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(BuildFolder::for_date(date).as_str(), "2024-01-01");
    }

    #[test]
    fn project_wire_field_names() {
        let project = Project {
            app_identifier: "com.example.foo".into(),
            name: "Foo".into(),
            build_version: "1.0".into(),
            uploaded_at: "2024-01-01".into(),
            plist_url: "https://h/Foo/2024-01-01/Foo.plist".into(),
            html_url: None,
            single_page: false,
            extra: BTreeMap::new(),
        };
        let value = serde_json::to_value(&project).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "app_identifier",
                "build_version",
                "name",
                "plist_url",
                "single_page",
                "uploaded_at"
            ]
        );
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let json = r#"{"build_version":"2","uploaded_at":"2024-01-02","plist_url":"u","tester":"qa"}"#;
        let build: Build = serde_json::from_str(json).unwrap();
        assert_eq!(build.extra.get("tester"), Some(&serde_json::json!("qa")));
        let back = serde_json::to_value(&build).unwrap();
        assert_eq!(back["tester"], "qa");
    }

    #[test]
    fn legacy_project_without_optional_fields_parses() {
        let json = r#"{"app_identifier":"a","name":"n","build_version":"1","uploaded_at":"d","plist_url":"p"}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(project.html_url.is_none());
        assert!(!project.single_page);
        assert_eq!(project.ledger_key(), "n");
    }
}
