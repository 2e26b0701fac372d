//! Tera rendering engine: [`TemplateEngine`] and [`Renderer`].
//!
//! # Templates
//!
//! | Name                  | Output                                  |
//! |-----------------------|-----------------------------------------|
//! | `manifest.plist.tera` | `<app>/<folder>/<artifact stem>.plist`  |
//! | `landing.html.tera`   | `<app>/<folder>/<artifact stem>.html`   |
//! | `index.html.tera`     | `index.html` at the store root          |
//!
//! Every substituted value goes through the `escape_xml` filter.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tera::{Tera, Value};

use crate::context::{to_tera_context, IndexContext, LandingContext, ManifestContext};
use crate::error::RenderError;

pub const MANIFEST_TEMPLATE: &str = "manifest.plist.tera";
pub const LANDING_TEMPLATE: &str = "landing.html.tera";
pub const INDEX_TEMPLATE: &str = "index.html.tera";

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (MANIFEST_TEMPLATE, include_str!("templates/manifest.plist.tera")),
    (LANDING_TEMPLATE, include_str!("templates/landing.html.tera")),
    (INDEX_TEMPLATE, include_str!("templates/index.html.tera")),
];

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Escape `& < > " '` for XML text and attribute values.
pub fn escape_xml_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

fn escape_xml(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(Value::String(escape_xml_str(&raw)))
}

// ---------------------------------------------------------------------------
// Template loading helpers
// ---------------------------------------------------------------------------

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io { path: path.into(), source }
}

fn normalize_template_name(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/").to_lowercase()
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, RenderError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut files = Vec::new();
    collect_template_files(dir, &mut files)?;
    let mut templates = Vec::new();
    for path in files {
        if path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
        let name = normalize_template_name(rel);
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = HashMap::new();
    for (name, content) in TPLS {
        templates.insert(normalize_template_name(Path::new(name)), (*content).to_string());
    }
    if let Some(dir) = user_template_dir {
        for (name, content) in load_user_templates(dir)? {
            templates.insert(name, content);
        }
    }

    let mut tera = Tera::default();
    // Escaping is explicit through `escape_xml`.
    tera.autoescape_on(vec![]);
    tera.register_filter("escape_xml", escape_xml);
    let items: Vec<(String, String)> = templates.into_iter().collect();
    tera.add_raw_templates(items)?;
    Ok(tera)
}

fn normalize_line_endings(content: String) -> String {
    if content.contains('\r') {
        content.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        content
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine for rendering templates with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that override embedded
/// defaults. Template names are normalised to lowercase relative paths.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render the template `name` with `ctx`. Output always uses LF endings.
    pub fn render<T: Serialize>(&self, name: &str, ctx: &T) -> Result<String, RenderError> {
        let tera_ctx = to_tera_context(ctx)?;
        let content = self.tera.render(name, &tera_ctx)?;
        Ok(normalize_line_endings(content))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Renders the published documents. Create once and reuse; rendering never
/// touches the store or the filesystem.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(None)? })
    }

    /// Embedded templates overridden by the `.tera` files in `dir`.
    pub fn with_template_dir(dir: Option<&Path>) -> Result<Self, RenderError> {
        Ok(Renderer { engine: TemplateEngine::new(dir)? })
    }

    pub fn render_manifest(&self, ctx: &ManifestContext) -> Result<String, RenderError> {
        self.engine.render(MANIFEST_TEMPLATE, ctx)
    }

    pub fn render_landing(&self, ctx: &LandingContext) -> Result<String, RenderError> {
        self.engine.render(LANDING_TEMPLATE, ctx)
    }

    pub fn render_index(&self) -> Result<String, RenderError> {
        self.engine.render(INDEX_TEMPLATE, &IndexContext::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
