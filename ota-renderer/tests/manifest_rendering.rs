use ota_renderer::{ManifestContext, Renderer, TemplateEngine, MANIFEST_TEMPLATE};
use plist::Value;
use tempfile::TempDir;

fn ctx() -> ManifestContext {
    ManifestContext {
        url: "https://builds.example.com/Foo/2024-01-01/Foo.ipa".into(),
        bundle_identifier: "com.example.foo".into(),
        bundle_version: "1.1".into(),
        title: "Foo".into(),
    }
}

fn parse(xml: &str) -> plist::Dictionary {
    Value::from_reader_xml(xml.as_bytes())
        .unwrap_or_else(|e| panic!("rendered manifest is not a plist: {e}\n{xml}"))
        .into_dictionary()
        .expect("manifest root must be a dictionary")
}

fn item(root: &plist::Dictionary) -> &plist::Dictionary {
    root.get("items")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_dictionary)
        .expect("items[0]")
}

#[test]
fn manifest_has_apple_ota_structure() {
    let xml = Renderer::new().unwrap().render_manifest(&ctx()).unwrap();
    let root = parse(&xml);
    let item = item(&root);

    let asset = item
        .get("assets")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(Value::as_dictionary)
        .expect("assets[0]");
    assert_eq!(asset.get("kind").and_then(Value::as_string), Some("software-package"));
    assert_eq!(
        asset.get("url").and_then(Value::as_string),
        Some("https://builds.example.com/Foo/2024-01-01/Foo.ipa")
    );

    let metadata = item.get("metadata").and_then(Value::as_dictionary).expect("metadata");
    assert_eq!(
        metadata.get("bundle-identifier").and_then(Value::as_string),
        Some("com.example.foo")
    );
    assert_eq!(metadata.get("bundle-version").and_then(Value::as_string), Some("1.1"));
    assert_eq!(metadata.get("kind").and_then(Value::as_string), Some("software"));
    assert_eq!(metadata.get("title").and_then(Value::as_string), Some("Foo"));
}

#[test]
fn manifest_leaves_no_placeholders() {
    let xml = Renderer::new().unwrap().render_manifest(&ctx()).unwrap();
    assert!(!xml.contains("{{"), "unrendered placeholder in:\n{xml}");
    assert!(!xml.contains("}}"));
    assert!(!xml.contains('\r'));
}

#[test]
fn special_characters_round_trip_through_plist() {
    let mut c = ctx();
    c.title = r#"Tom & Jerry's <"Beta">"#.into();
    c.url = "https://h/Foo/2024-01-01/Foo.ipa?sig=a&exp=1".into();
    let xml = Renderer::new().unwrap().render_manifest(&c).unwrap();
    assert!(xml.contains("Tom &amp; Jerry&apos;s &lt;&quot;Beta&quot;&gt;"));

    let root = parse(&xml);
    let item = item(&root);
    let metadata = item.get("metadata").and_then(Value::as_dictionary).unwrap();
    assert_eq!(
        metadata.get("title").and_then(Value::as_string),
        Some(r#"Tom & Jerry's <"Beta">"#)
    );
}

#[test]
fn user_template_overrides_embedded_manifest() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("MANIFEST.plist.tera"),
        "custom {{ title | escape_xml }}\r\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let renderer = Renderer::with_template_dir(Some(dir.path())).unwrap();
    assert_eq!(renderer.render_manifest(&ctx()).unwrap(), "custom Foo\n");
    // Templates without an override keep the embedded default.
    assert!(renderer.render_index().unwrap().contains("projects.json"));
}

#[test]
fn missing_template_dir_falls_back_to_embedded() {
    let dir = TempDir::new().unwrap();
    let engine = TemplateEngine::new(Some(&dir.path().join("absent"))).unwrap();
    let xml = engine.render(MANIFEST_TEMPLATE, &ctx()).unwrap();
    assert!(xml.starts_with("<?xml"));
}
