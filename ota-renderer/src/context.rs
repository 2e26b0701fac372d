//! Template contexts, one per published document.

use serde::{Deserialize, Serialize};

use ota_core::ledger::PROJECTS_FILE;

use crate::error::RenderError;

/// Values substituted into the install manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestContext {
    /// Public URL of the uploaded artifact.
    pub url: String,
    pub bundle_identifier: String,
    pub bundle_version: String,
    pub title: String,
}

/// Values substituted into the per-build landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandingContext {
    /// Public URL of the install manifest the install link points to.
    pub manifest_url: String,
    pub name: String,
    pub bundle_version: String,
    pub changelog: Option<String>,
    pub uploaded_at: String,
}

/// The index page is static; it only needs to know where the Projects
/// ledger lives relative to itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexContext {
    pub projects_file: String,
}

impl Default for IndexContext {
    fn default() -> Self {
        Self {
            projects_file: PROJECTS_FILE.to_string(),
        }
    }
}

/// Convert any context to a [`tera::Context`].
pub(crate) fn to_tera_context<T: Serialize>(ctx: &T) -> Result<tera::Context, RenderError> {
    tera::Context::from_serialize(ctx).map_err(RenderError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landing_context_keeps_missing_changelog() {
        let ctx = LandingContext {
            manifest_url: "https://h/Foo/2024-01-01/Foo.plist".into(),
            name: "Foo".into(),
            bundle_version: "1.0".into(),
            changelog: None,
            uploaded_at: "2024-01-01".into(),
        };
        let tera_ctx = to_tera_context(&ctx).unwrap();
        assert_eq!(tera_ctx.get("changelog"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn index_context_points_at_projects_ledger() {
        assert_eq!(IndexContext::default().projects_file, "projects.json");
    }
}
