//! Publisher configuration (`ota.yaml`).
//!
//! ```yaml
//! base_url: https://builds.example.com/ios
//! backend:
//!   kind: s3
//!   bucket: my-builds
//!   region: eu-central-1
//! ```
//!
//! Secrets may be left out of the file and supplied through the environment,
//! see [`PublisherConfig::apply_env`].

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default `uploaded_at` format: one ledger entry per calendar day.
pub const DEFAULT_UPLOADED_AT_FORMAT: &str = "%Y-%m-%d";
pub const DEFAULT_CONFIG_FILE: &str = "ota.yaml";

pub const ENV_FTP_PASSWORD: &str = "OTA_FTP_PASSWORD";
pub const ENV_S3_ACCESS_KEY: &str = "OTA_S3_ACCESS_KEY";
pub const ENV_S3_SECRET_KEY: &str = "OTA_S3_SECRET_KEY";

fn default_ftp_port() -> u16 {
    21
}

fn default_ftp_root() -> String {
    "/www".to_string()
}

fn default_true() -> bool {
    true
}

fn default_uploaded_at_format() -> String {
    DEFAULT_UPLOADED_AT_FORMAT.to_string()
}

// ---------------------------------------------------------------------------
// Backends
// ---------------------------------------------------------------------------

/// FTP server credentials and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtpConfig {
    pub host: String,
    #[serde(default = "default_ftp_port")]
    pub port: u16,
    /// `None` or empty logs in anonymously.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_ftp_root")]
    pub root_dir: String,
    /// Sub-path below `root_dir`; also appended to `base_url`.
    #[serde(default)]
    pub path: String,
}

impl FtpConfig {
    /// Absolute remote directory holding `projects.json`.
    pub fn remote_root(&self) -> String {
        let root = self.root_dir.trim_end_matches('/');
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            if root.is_empty() { "/".to_string() } else { root.to_string() }
        } else {
            format!("{root}/{path}")
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user.as_deref().map_or(true, |u| u.trim().is_empty())
    }
}

/// S3 (or S3-compatible) bucket credentials and location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services; enables path-style URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Key prefix inside the bucket.
    #[serde(default)]
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    #[serde(default = "default_true")]
    pub public_read: bool,
}

/// Local directory served by a web server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirConfig {
    pub path: PathBuf,
}

/// Which remote store a deploy targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    Ftp(FtpConfig),
    S3(S3Config),
    Dir(DirConfig),
}

impl BackendConfig {
    /// FTP deploys historically publish neither landing pages nor an index.
    fn publishes_pages_by_default(&self) -> bool {
        !matches!(self, BackendConfig::Ftp(_))
    }
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Root of `ota.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Public URL under which the store root is served.
    pub base_url: String,
    /// chrono strftime pattern for `uploaded_at`; also the Builds ledger
    /// dedup granularity.
    #[serde(default = "default_uploaded_at_format")]
    pub uploaded_at_format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landing_pages: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_page: Option<bool>,
    #[serde(default = "default_true")]
    pub verify_ledgers: bool,
    /// Directory with `.tera` overrides for the embedded templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
    pub backend: BackendConfig,
}

impl PublisherConfig {
    /// Create a config with defaults for everything but the essentials.
    pub fn new(base_url: impl Into<String>, backend: BackendConfig) -> Self {
        Self {
            base_url: base_url.into(),
            uploaded_at_format: default_uploaded_at_format(),
            landing_pages: None,
            index_page: None,
            verify_ledgers: true,
            template_dir: None,
            backend,
        }
    }

    /// Load and validate a YAML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Fill missing secrets from `OTA_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// [`apply_env`](Self::apply_env) with an injectable lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        match &mut self.backend {
            BackendConfig::Ftp(ftp) => {
                if ftp.password.is_none() {
                    ftp.password = lookup(ENV_FTP_PASSWORD);
                }
            }
            BackendConfig::S3(s3) => {
                if s3.access_key.is_none() {
                    s3.access_key = lookup(ENV_S3_ACCESS_KEY);
                }
                if s3.secret_key.is_none() {
                    s3.secret_key = lookup(ENV_S3_SECRET_KEY);
                }
            }
            BackendConfig::Dir(_) => {}
        }
    }

    /// Whether per-build landing pages are published.
    pub fn landing_pages(&self) -> bool {
        self.landing_pages
            .unwrap_or_else(|| self.backend.publishes_pages_by_default())
    }

    /// Whether the bucket-wide index page is bootstrapped.
    pub fn index_page(&self) -> bool {
        self.index_page
            .unwrap_or_else(|| self.backend.publishes_pages_by_default())
    }

    /// Public base URL including the FTP sub-path, without trailing slash.
    pub fn public_base_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match &self.backend {
            BackendConfig::Ftp(ftp) if !ftp.path.trim_matches('/').is_empty() => {
                format!("{base}/{}", ftp.path.trim_matches('/'))
            }
            _ => base.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        validate_uploaded_at_format(&self.uploaded_at_format)?;
        match &self.backend {
            BackendConfig::Ftp(ftp) if ftp.host.trim().is_empty() => {
                Err(ConfigError::Invalid("ftp host must not be empty".into()))
            }
            BackendConfig::S3(s3) if s3.bucket.trim().is_empty() => {
                Err(ConfigError::Invalid("s3 bucket must not be empty".into()))
            }
            BackendConfig::Dir(dir) if dir.path.as_os_str().is_empty() => {
                Err(ConfigError::Invalid("dir path must not be empty".into()))
            }
            _ => Ok(()),
        }
    }
}

/// Reject strftime patterns that chrono cannot format or that render empty.
fn validate_uploaded_at_format(format: &str) -> Result<(), ConfigError> {
    use chrono::format::{Item, StrftimeItems};

    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::Invalid(format!(
            "uploaded_at_format '{format}' is not a valid strftime pattern"
        )));
    }
    let sample = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_default();
    if sample.trim().is_empty() {
        return Err(ConfigError::Invalid(
            "uploaded_at_format must not render empty".into(),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn ftp(path: &str) -> BackendConfig {
        BackendConfig::Ftp(FtpConfig {
            host: "ftp.example.com".into(),
            port: 21,
            user: None,
            password: None,
            root_dir: "/www".into(),
            path: path.into(),
        })
    }

    #[test]
    fn parse_s3_config_with_defaults() {
        let yaml = "base_url: https://b.example.com\nbackend:\n  kind: s3\n  bucket: builds\n";
        let config: PublisherConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.uploaded_at_format, "%Y-%m-%d");
        assert!(config.verify_ledgers);
        assert!(config.landing_pages());
        assert!(config.index_page());
        match config.backend {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "builds");
                assert!(s3.public_read);
                assert!(s3.prefix.is_empty());
            }
            other => panic!("expected s3 backend, got {other:?}"),
        }
    }

    #[test]
    fn ftp_defaults_disable_pages() {
        let config = PublisherConfig::new("https://h", ftp("ios"));
        assert!(!config.landing_pages());
        assert!(!config.index_page());
        let mut forced = config.clone();
        forced.landing_pages = Some(true);
        assert!(forced.landing_pages());
    }

    #[test]
    fn ftp_remote_root_and_public_base() {
        let config = PublisherConfig::new("https://h/", ftp("/ios/"));
        let BackendConfig::Ftp(f) = &config.backend else { unreachable!() };
        assert_eq!(f.remote_root(), "/www/ios");
        assert_eq!(config.public_base_url(), "https://h/ios");

        let config = PublisherConfig::new("https://h", ftp(""));
        let BackendConfig::Ftp(f) = &config.backend else { unreachable!() };
        assert_eq!(f.remote_root(), "/www");
        assert_eq!(config.public_base_url(), "https://h");
        assert!(f.is_anonymous());
    }

    #[test]
    fn env_fills_only_missing_secrets() {
        let mut config = PublisherConfig::new(
            "https://h",
            BackendConfig::S3(S3Config {
                bucket: "b".into(),
                region: None,
                endpoint: None,
                prefix: String::new(),
                access_key: Some("from-file".into()),
                secret_key: None,
                public_read: true,
            }),
        );
        config.apply_env_with(|key| Some(format!("env:{key}")));
        let BackendConfig::S3(s3) = &config.backend else { unreachable!() };
        assert_eq!(s3.access_key.as_deref(), Some("from-file"));
        assert_eq!(s3.secret_key.as_deref(), Some("env:OTA_S3_SECRET_KEY"));
    }

    #[test]
    fn validate_rejects_empty_base_url_and_bad_format() {
        let mut config = PublisherConfig::new("", ftp(""));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.base_url = "https://h".into();
        config.uploaded_at_format = "%Q".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        config.uploaded_at_format = "%d-%m-%Y %H:%M".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_reports_parse_error_with_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ota.yaml");
        std::fs::write(&path, "base_url: [unclosed").unwrap();
        let err = PublisherConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("ota.yaml"));
    }
}
