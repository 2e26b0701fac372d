//! S3 (and S3-compatible) backend on `rust-s3`'s blocking client.
//!
//! Directories do not exist here: a "directory" is a key prefix, `mkdir` is
//! a no-op and listing uses `/` as delimiter to recover one level.

use std::collections::BTreeSet;

use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, BucketConfiguration, Region};

use ota_core::S3Config;

use crate::error::StoreError;
use crate::paths;
use crate::{RemoteStore, StoreKind};

const DEFAULT_REGION: &str = "us-east-1";

/// Build the `rust-s3` region from config: custom endpoint wins.
pub(crate) fn region_for(config: &S3Config) -> Result<Region, StoreError> {
    let name = config.region.clone().unwrap_or_else(|| DEFAULT_REGION.to_string());
    match &config.endpoint {
        Some(endpoint) => Ok(Region::Custom {
            region: name,
            endpoint: endpoint.clone(),
        }),
        None => name
            .parse::<Region>()
            .map_err(|e| StoreError::Config(format!("unknown region '{name}': {e}"))),
    }
}

fn credentials_for(config: &S3Config) -> Result<Credentials, StoreError> {
    Credentials::new(
        config.access_key.as_deref(),
        config.secret_key.as_deref(),
        None,
        None,
        None,
    )
    .map_err(|e| StoreError::Config(format!("s3 credentials: {e}")))
}

/// Map an HTTP status onto the store taxonomy; `None` for success.
pub(crate) fn status_error(path: &str, status: u16, body: &str) -> Option<StoreError> {
    match status {
        200..=299 => None,
        404 => Some(StoreError::NotFound {
            path: path.to_string(),
        }),
        401 | 403 => Some(StoreError::PermissionDenied {
            path: path.to_string(),
            message: body.trim().to_string(),
        }),
        _ => Some(StoreError::Unavailable {
            message: format!("{path}: HTTP {status} {}", body.trim()),
        }),
    }
}

fn map_err(path: &str, e: S3Error) -> StoreError {
    match e {
        S3Error::HttpFailWithBody(status, body) => status_error(path, status, &body)
            .unwrap_or_else(|| StoreError::Unavailable {
                message: format!("{path}: HTTP {status}"),
            }),
        other => StoreError::Unavailable {
            message: format!("{path}: {other}"),
        },
    }
}

/// Status of a `DELETE`: success and 404 are both fine.
pub(crate) fn delete_status(path: &str, status: u16, body: &str) -> Result<(), StoreError> {
    match status_error(path, status, body) {
        None | Some(StoreError::NotFound { .. }) => Ok(()),
        Some(err) => Err(err),
    }
}

/// Status of a HEAD on the bucket: `Ok(true)` if it exists, `Ok(false)` if it
/// does not.
pub(crate) fn bucket_head_status(bucket: &str, status: u16) -> Result<bool, StoreError> {
    match status {
        200..=299 => Ok(true),
        404 => Ok(false),
        401 | 403 => Err(StoreError::PermissionDenied {
            path: bucket.to_string(),
            message: format!("bucket '{bucket}' exists but is not accessible with these credentials"),
        }),
        _ => Err(StoreError::Unavailable {
            message: format!("{bucket}: HTTP {status} checking bucket"),
        }),
    }
}

/// Status of a bucket creation; `None` for success.
pub(crate) fn bucket_create_status(bucket: &str, status: u16, body: &str) -> Option<StoreError> {
    match status {
        // BucketAlreadyExists: the name belongs to another account.
        403 | 409 => Some(StoreError::PermissionDenied {
            path: bucket.to_string(),
            message: format!("bucket '{bucket}' already exists and is owned by another account"),
        }),
        _ => status_error(bucket, status, body),
    }
}

pub struct S3Store {
    bucket: Box<Bucket>,
    region: Region,
    credentials: Credentials,
    path_style: bool,
    prefix: String,
    base_url: String,
}

impl S3Store {
    pub fn new(config: &S3Config, base_url: impl Into<String>) -> Result<Self, StoreError> {
        let region = region_for(config)?;
        let credentials = credentials_for(config)?;
        let path_style = config.endpoint.is_some();

        let mut bucket = Bucket::new(&config.bucket, region.clone(), credentials.clone())
            .map_err(|e| StoreError::Connection {
                target: config.bucket.clone(),
                message: e.to_string(),
            })?;
        if path_style {
            bucket = bucket.with_path_style();
        }
        if config.public_read {
            bucket.add_header("x-amz-acl", "public-read");
        }

        Ok(Self {
            bucket,
            region,
            credentials,
            path_style,
            prefix: paths::normalize(&config.prefix),
            base_url: base_url.into(),
        })
    }

    fn key(&self, path: &str) -> String {
        paths::join(&self.prefix, path)
    }

    /// Delete one key; a missing key is fine, any other failure status is not.
    fn delete_key(&self, path: &str, key: &str) -> Result<(), StoreError> {
        match self.bucket.delete_object(key) {
            Ok(response) => {
                let body = String::from_utf8_lossy(response.as_slice());
                delete_status(path, response.status_code(), &body)
            }
            Err(e) => match map_err(path, e) {
                StoreError::NotFound { .. } => Ok(()),
                other => Err(other),
            },
        }
    }

    /// All keys under `key_prefix`, recursively.
    fn keys_under(&self, key_prefix: &str) -> Result<Vec<String>, StoreError> {
        let results = self
            .bucket
            .list(key_prefix.to_string(), None)
            .map_err(|e| map_err(key_prefix, e))?;
        Ok(results
            .into_iter()
            .flat_map(|page| page.contents.into_iter().map(|object| object.key))
            .collect())
    }
}

impl RemoteStore for S3Store {
    fn kind(&self) -> StoreKind {
        StoreKind::S3
    }

    fn root_exists(&mut self) -> Result<bool, StoreError> {
        let name = self.bucket.name();
        let (_, status) = self.bucket.head_object("/").map_err(|e| map_err(&name, e))?;
        bucket_head_status(&name, status)
    }

    fn ensure_root(&mut self) -> Result<bool, StoreError> {
        if self.root_exists()? {
            return Ok(false);
        }

        let name = self.bucket.name();
        let config = BucketConfiguration::public();
        let created = if self.path_style {
            Bucket::create_with_path_style(&name, self.region.clone(), self.credentials.clone(), config)
        } else {
            Bucket::create(&name, self.region.clone(), self.credentials.clone(), config)
        }
        .map_err(|e| map_err(&name, e))?;

        if let Some(err) = bucket_create_status(&name, created.response_code, &created.response_text) {
            return Err(err);
        }
        tracing::info!(bucket = %name, "created bucket");
        Ok(true)
    }

    fn list(&mut self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        let base = self.key(prefix);
        let scope = if base.is_empty() { String::new() } else { format!("{base}/") };
        let pages = self
            .bucket
            .list(scope.clone(), Some("/".to_string()))
            .map_err(|e| map_err(prefix, e))?;

        let mut names = BTreeSet::new();
        for page in pages {
            for object in page.contents {
                if let Some(name) = object.key.strip_prefix(scope.as_str()) {
                    if !name.is_empty() {
                        names.insert(name.to_string());
                    }
                }
            }
            for common in page.common_prefixes.unwrap_or_default() {
                if let Some(name) = common.prefix.strip_prefix(scope.as_str()) {
                    let name = name.trim_end_matches('/');
                    if !name.is_empty() {
                        names.insert(name.to_string());
                    }
                }
            }
        }
        Ok(names)
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>, StoreError> {
        let key = self.key(path);
        let response = self.bucket.get_object(&key).map_err(|e| map_err(path, e))?;
        let bytes = response.as_slice().to_vec();
        match status_error(path, response.status_code(), &String::from_utf8_lossy(&bytes)) {
            Some(err) => Err(err),
            None => Ok(bytes),
        }
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let key = self.key(path);
        let response = self
            .bucket
            .put_object_with_content_type(&key, bytes, paths::content_type_for(path))
            .map_err(|e| map_err(path, e))?;
        match status_error(path, response.status_code(), &String::from_utf8_lossy(response.as_slice())) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        let key = self.key(path);
        self.delete_key(path, &key)
    }

    fn delete_tree(&mut self, path: &str) -> Result<(), StoreError> {
        let base = self.key(path);
        if paths::normalize(path).is_empty() {
            return Err(StoreError::Config("refusing to delete the store root".into()));
        }
        let mut keys = self.keys_under(&format!("{base}/"))?;
        keys.push(base);
        for key in keys {
            tracing::debug!("deleting {key}");
            self.delete_key(&key, &key)?;
        }
        Ok(())
    }

    fn mkdir(&mut self, _path: &str) -> Result<(), StoreError> {
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        paths::public_url(&self.base_url, &self.key(path))
    }
}
