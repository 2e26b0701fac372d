//! # ota-renderer
//!
//! Tera-based rendering of the three documents a deployment publishes: the
//! install manifest (plist), the per-build landing page and the bucket index
//! page.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ota_renderer::{ManifestContext, Renderer};
//!
//! fn manifest() -> Result<String, ota_renderer::RenderError> {
//!     let renderer = Renderer::new()?;
//!     renderer.render_manifest(&ManifestContext {
//!         url: "https://builds.example.com/Foo/2024-01-01/Foo.ipa".into(),
//!         bundle_identifier: "com.example.foo".into(),
//!         bundle_version: "1.0".into(),
//!         title: "Foo".into(),
//!     })
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{IndexContext, LandingContext, ManifestContext};
pub use engine::{Renderer, TemplateEngine, INDEX_TEMPLATE, LANDING_TEMPLATE, MANIFEST_TEMPLATE};
pub use error::RenderError;
