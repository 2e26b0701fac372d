use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const BASE: &str = "https://builds.example.com";

const OTA_ENV: &[&str] = &[
    "OTA_CONFIG",
    "OTA_ARTIFACT",
    "OTA_APP_IDENTIFIER",
    "OTA_APP_NAME",
    "OTA_BUILD_VERSION",
    "OTA_CHANGELOG",
    "OTA_SINGLE_PAGE",
    "RUST_LOG",
];

struct Fixture {
    tmp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let config = format!(
            "base_url: {BASE}\nbackend:\n  kind: dir\n  path: {}\n",
            tmp.path().join("www").display()
        );
        std::fs::write(tmp.path().join("ota.yaml"), config).unwrap();
        std::fs::write(tmp.path().join("Foo.ipa"), b"ipa-bytes").unwrap();
        Self { tmp }
    }

    fn www(&self) -> PathBuf {
        self.tmp.path().join("www")
    }

    fn artifact(&self) -> PathBuf {
        self.tmp.path().join("Foo.ipa")
    }

    fn config(&self) -> PathBuf {
        self.tmp.path().join("ota.yaml")
    }

    fn ota(&self) -> Command {
        let mut cmd = Command::cargo_bin("ota").expect("ota binary");
        for key in OTA_ENV {
            cmd.env_remove(key);
        }
        cmd.arg("--config").arg(self.config());
        cmd
    }

    fn deploy(&self, version: &str) -> Command {
        let mut cmd = self.ota();
        cmd.arg("deploy")
            .arg(self.artifact())
            .args(["--app-identifier", "com.example.foo"])
            .args(["--name", "Foo"])
            .args(["--build-version", version]);
        cmd
    }
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn last_line(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout)
        .lines()
        .last()
        .unwrap_or_default()
        .to_string()
}

#[test]
fn deploy_prints_public_url_and_publishes_files() {
    let fx = Fixture::new();
    let output = fx.deploy("1.0").output().unwrap();
    assert!(
        output.status.success(),
        "deploy failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(last_line(&output.stdout), format!("{BASE}/index.html"));

    let www = fx.www();
    assert!(www.join("index.html").is_file());
    let folders: Vec<_> = std::fs::read_dir(www.join("Foo"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .collect();
    assert_eq!(folders.len(), 1, "exactly one build folder");
    let folder = folders[0].path();
    assert_eq!(std::fs::read(folder.join("Foo.ipa")).unwrap(), b"ipa-bytes");
    assert!(folder.join("Foo.plist").is_file());
    assert!(folder.join("Foo.html").is_file());

    let projects = read_json(&www.join("projects.json"));
    assert_eq!(projects[0]["name"], "Foo");
    assert_eq!(projects[0]["build_version"], "1.0");
    let builds = read_json(&www.join("Foo/builds.json"));
    assert_eq!(builds.as_array().unwrap().len(), 1);
}

#[test]
fn same_day_redeploy_keeps_one_build_entry() {
    let fx = Fixture::new();
    fx.deploy("1.0").assert().success();
    fx.deploy("1.1").assert().success();

    let builds = read_json(&fx.www().join("Foo/builds.json"));
    let builds = builds.as_array().unwrap();
    assert_eq!(builds.len(), 1);
    assert_eq!(builds[0]["build_version"], "1.1");
}

#[test]
fn dry_run_writes_nothing() {
    let fx = Fixture::new();
    fx.deploy("1.0")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("[dry-run]"))
        .stdout(predicate::str::contains("would write: projects.json"));
    assert!(!fx.www().exists(), "dry run must not create the store root");
}

#[test]
fn json_report_lists_urls_and_actions() {
    let fx = Fixture::new();
    let output = fx.deploy("1.0").arg("--json").output().unwrap();
    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["public_url"], format!("{BASE}/index.html"));
    assert!(report["manifest_url"].as_str().unwrap().ends_with("/Foo.plist"));
    assert!(report["actions"].as_array().unwrap().len() > 5);
}

#[test]
fn base_url_flag_overrides_config() {
    let fx = Fixture::new();
    fx.deploy("1.0")
        .args(["--base-url", "https://cdn.example.org/ios"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("https://cdn.example.org/ios/index.html\n"));
}

#[test]
fn request_fields_fall_back_to_environment() {
    let fx = Fixture::new();
    fx.ota()
        .arg("deploy")
        .env("OTA_ARTIFACT", fx.artifact())
        .env("OTA_APP_IDENTIFIER", "com.example.foo")
        .env("OTA_APP_NAME", "Foo Env")
        .env("OTA_BUILD_VERSION", "3.0")
        .env("OTA_CHANGELOG", "from env")
        .assert()
        .success();

    let projects = read_json(&fx.www().join("projects.json"));
    assert_eq!(projects[0]["name"], "Foo_Env");
    assert_eq!(projects[0]["build_version"], "3.0");
}

#[test]
fn missing_artifact_fails_with_message() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.artifact()).unwrap();
    fx.deploy("1.0")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("artifact not found"));
}

#[test]
fn missing_config_fails() {
    let fx = Fixture::new();
    std::fs::remove_file(fx.config()).unwrap();
    fx.deploy("1.0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn ledger_commands_show_published_builds() {
    let fx = Fixture::new();
    fx.deploy("1.0").assert().success();

    fx.ota()
        .args(["ledger", "projects"])
        .assert()
        .success()
        .stdout(predicate::str::contains("com.example.foo"));

    let output = fx.ota().args(["ledger", "builds", "Foo", "--json"]).output().unwrap();
    assert!(output.status.success());
    let builds: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(builds[0]["build_version"], "1.0");
}

#[test]
fn ledger_of_unknown_app_is_empty() {
    let fx = Fixture::new();
    fx.ota()
        .args(["ledger", "builds", "Nope"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No builds published"));
}

#[test]
fn upload_creates_parents_and_prints_urls() {
    let fx = Fixture::new();
    let src = fx.tmp.path().join("notes.txt");
    std::fs::write(&src, "release notes").unwrap();

    fx.ota()
        .arg("upload")
        .arg(format!("{}=docs/1.0/notes.txt", src.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("{BASE}/docs/1.0/notes.txt")));
    assert_eq!(
        std::fs::read_to_string(fx.www().join("docs/1.0/notes.txt")).unwrap(),
        "release notes"
    );
}

#[test]
fn upload_rejects_malformed_pair() {
    let fx = Fixture::new();
    fx.ota()
        .args(["upload", "no-separator"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SRC=DEST"));
}

#[test]
fn deploy_rejects_name_outside_app_folder() {
    let fx = Fixture::new();
    fx.ota()
        .arg("deploy")
        .arg(fx.artifact())
        .args(["--app-identifier", "com.example.foo"])
        .args(["--name", "../Other"])
        .args(["--build-version", "1.0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid app name"));
    assert!(!fx.tmp.path().join("Other").exists());

    fx.ota()
        .args(["ledger", "builds", "../Other"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid app name"));
}
