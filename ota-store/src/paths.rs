//! Remote path and public URL helpers shared by all backends.

/// Trim slashes and collapse empty segments: `"/a//b/"` → `"a/b"`.
pub fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Join two relative paths, ignoring empty sides.
pub fn join(prefix: &str, path: &str) -> String {
    match (normalize(prefix), normalize(path)) {
        (p, r) if p.is_empty() => r,
        (p, r) if r.is_empty() => p,
        (p, r) => format!("{p}/{r}"),
    }
}

/// Every ancestor directory of `path`, shortest first: `a/b/c` → `a`, `a/b`.
pub fn ancestors(path: &str) -> Vec<String> {
    let normalized = normalize(path);
    let segments: Vec<&str> = normalized.split('/').collect();
    (1..segments.len())
        .map(|n| segments[..n].join("/"))
        .collect()
}

/// Last segment of a path.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

/// `base_url` + `path`, each path segment percent-encoded.
pub fn public_url(base_url: &str, path: &str) -> String {
    let encoded = normalize(path)
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    let base = base_url.trim_end_matches('/');
    if encoded.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{encoded}")
    }
}

/// MIME type used when uploading `path`.
pub fn content_type_for(path: &str) -> &'static str {
    let ext = file_name(path)
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("plist") => "text/xml",
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_slashes() {
        assert_eq!(normalize("/a//b/"), "a/b");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn join_handles_empty_sides() {
        assert_eq!(join("", "projects.json"), "projects.json");
        assert_eq!(join("ios/", "/Foo/builds.json"), "ios/Foo/builds.json");
        assert_eq!(join("ios", ""), "ios");
    }

    #[test]
    fn ancestors_shortest_first() {
        assert_eq!(ancestors("a/b/c.ipa"), vec!["a", "a/b"]);
        assert!(ancestors("c.ipa").is_empty());
    }

    #[test]
    fn public_url_encodes_segments() {
        assert_eq!(
            public_url("https://h.example.com/ios/", "My App/2024-01-01/My App.plist"),
            "https://h.example.com/ios/My%20App/2024-01-01/My%20App.plist"
        );
        assert_eq!(public_url("https://h", ""), "https://h/");
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for("a/b/App.plist"), "text/xml");
        assert_eq!(content_type_for("index.html"), "text/html; charset=utf-8");
        assert_eq!(content_type_for("projects.json"), "application/json");
        assert_eq!(content_type_for("a/App.ipa"), "application/octet-stream");
        assert_eq!(content_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn file_name_is_last_segment() {
        assert_eq!(file_name("a/b/App.ipa"), "App.ipa");
        assert_eq!(file_name("App.ipa"), "App.ipa");
    }
}
