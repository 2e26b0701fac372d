//! FTP backend.
//!
//! Connect → login (anonymous when no user) → passive mode → binary type.
//! All remote calls use absolute paths under the configured root, so the
//! session's working directory never matters.

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::Path;

use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream, Mode};

use ota_core::FtpConfig;

use crate::error::{io_err, StoreError};
use crate::paths;
use crate::{RemoteStore, StoreKind};

const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// How an FTP reply code maps onto the store taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReplyClass {
    NotFound,
    Denied,
    Other,
}

pub(crate) fn classify_reply(code: u32) -> ReplyClass {
    match code {
        450 | 550 => ReplyClass::NotFound,
        530 | 532 | 553 => ReplyClass::Denied,
        _ => ReplyClass::Other,
    }
}

/// `(user, password)` to log in with.
pub(crate) fn credentials(config: &FtpConfig) -> (&str, &str) {
    if config.is_anonymous() {
        return (ANONYMOUS_USER, ANONYMOUS_PASSWORD);
    }
    (
        config.user.as_deref().unwrap_or(ANONYMOUS_USER),
        config.password.as_deref().unwrap_or(""),
    )
}

fn map_err(path: &str, e: FtpError) -> StoreError {
    match e {
        FtpError::UnexpectedResponse(response) => {
            let message = String::from_utf8_lossy(&response.body).trim().to_string();
            match classify_reply(response.status.code()) {
                ReplyClass::NotFound => StoreError::NotFound {
                    path: path.to_string(),
                },
                ReplyClass::Denied => StoreError::PermissionDenied {
                    path: path.to_string(),
                    message,
                },
                ReplyClass::Other => StoreError::Unavailable {
                    message: format!("{path}: {message}"),
                },
            }
        }
        other => StoreError::Unavailable {
            message: format!("{path}: {other}"),
        },
    }
}

fn connection_err(target: &str, e: FtpError) -> StoreError {
    StoreError::Connection {
        target: target.to_string(),
        message: e.to_string(),
    }
}

pub struct FtpStore {
    stream: FtpStream,
    root: String,
    base_url: String,
}

impl FtpStore {
    /// Open a session. Fails with [`StoreError::Connection`] if the server is
    /// unreachable or rejects the login.
    pub fn connect(config: &FtpConfig, base_url: impl Into<String>) -> Result<Self, StoreError> {
        let target = format!("{}:{}", config.host, config.port);
        let mut stream =
            FtpStream::connect(target.as_str()).map_err(|e| connection_err(&target, e))?;
        let (user, password) = credentials(config);
        stream
            .login(user, password)
            .map_err(|e| connection_err(&target, e))?;
        stream.set_mode(Mode::Passive);
        stream
            .transfer_type(FileType::Binary)
            .map_err(|e| connection_err(&target, e))?;
        tracing::debug!(%target, user, "ftp session open");

        Ok(Self {
            stream,
            root: config.remote_root(),
            base_url: base_url.into(),
        })
    }

    fn absolute(&self, path: &str) -> String {
        let rel = paths::normalize(path);
        let root = self.root.trim_end_matches('/');
        match (root.is_empty(), rel.is_empty()) {
            (true, true) => "/".to_string(),
            (true, false) => format!("/{rel}"),
            (false, true) => root.to_string(),
            (false, false) => format!("{root}/{rel}"),
        }
    }

    fn is_dir(&mut self, absolute: &str) -> bool {
        self.stream.cwd(absolute).is_ok()
    }

    /// `MKD` each segment of an absolute path; existing segments are fine.
    fn mkdir_absolute(&mut self, absolute: &str) -> Result<(), StoreError> {
        let mut current = String::new();
        for segment in absolute.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            if let Err(e) = self.stream.mkdir(&current) {
                tracing::debug!("mkdir {current}: {e}");
            }
        }
        self.stream
            .cwd(absolute)
            .map_err(|e| map_err(absolute, e))
    }
}

impl Drop for FtpStore {
    fn drop(&mut self) {
        let _ = self.stream.quit();
    }
}

impl RemoteStore for FtpStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Ftp
    }

    fn root_exists(&mut self) -> Result<bool, StoreError> {
        let root = self.absolute("");
        Ok(self.is_dir(&root))
    }

    fn ensure_root(&mut self) -> Result<bool, StoreError> {
        if self.root_exists()? {
            return Ok(false);
        }
        let root = self.absolute("");
        self.mkdir_absolute(&root)?;
        tracing::info!("created ftp root {root}");
        Ok(true)
    }

    fn list(&mut self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        let dir = self.absolute(prefix);
        match self.stream.nlst(Some(dir.as_str())) {
            Ok(entries) => Ok(entries
                .iter()
                .map(|entry| paths::file_name(entry).to_string())
                .filter(|name| !name.is_empty() && name != "." && name != "..")
                .collect()),
            Err(e) => match map_err(&dir, e) {
                StoreError::NotFound { .. } => Ok(BTreeSet::new()),
                other => Err(other),
            },
        }
    }

    fn read(&mut self, path: &str) -> Result<Vec<u8>, StoreError> {
        let absolute = self.absolute(path);
        let buffer = self
            .stream
            .retr_as_buffer(&absolute)
            .map_err(|e| map_err(path, e))?;
        Ok(buffer.into_inner())
    }

    fn write(&mut self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let absolute = self.absolute(path);
        self.stream
            .put_file(&absolute, &mut Cursor::new(bytes))
            .map_err(|e| map_err(path, e))?;
        Ok(())
    }

    fn write_file(&mut self, path: &str, local: &Path) -> Result<(), StoreError> {
        let absolute = self.absolute(path);
        let mut file = std::fs::File::open(local).map_err(|e| io_err(local, e))?;
        let sent = self
            .stream
            .put_file(&absolute, &mut file)
            .map_err(|e| map_err(path, e))?;
        tracing::debug!("uploaded {} ({sent} bytes)", local.display());
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), StoreError> {
        let absolute = self.absolute(path);
        match self.stream.rm(&absolute) {
            Ok(()) => Ok(()),
            Err(e) => match map_err(path, e) {
                StoreError::NotFound { .. } => Ok(()),
                other => Err(other),
            },
        }
    }

    fn delete_tree(&mut self, path: &str) -> Result<(), StoreError> {
        let rel = paths::normalize(path);
        if rel.is_empty() {
            return Err(StoreError::Config("refusing to delete the store root".into()));
        }
        let absolute = self.absolute(&rel);
        if !self.is_dir(&absolute) {
            return self.delete(&rel);
        }
        for name in self.list(&rel)? {
            let child = paths::join(&rel, &name);
            let child_abs = self.absolute(&child);
            if self.is_dir(&child_abs) {
                self.delete_tree(&child)?;
            } else {
                tracing::debug!("deleting {child}");
                self.delete(&child)?;
            }
        }
        // Leave the parent before removing the directory itself.
        let root = self.absolute("");
        let _ = self.stream.cwd(&root);
        match self.stream.rmdir(&absolute) {
            Ok(()) => Ok(()),
            Err(e) => match map_err(&rel, e) {
                StoreError::NotFound { .. } => Ok(()),
                other => Err(other),
            },
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<(), StoreError> {
        let absolute = self.absolute(path);
        self.mkdir_absolute(&absolute)
    }

    fn public_url(&self, path: &str) -> String {
        paths::public_url(&self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(user: Option<&str>, password: Option<&str>) -> FtpConfig {
        FtpConfig {
            host: "ftp.example.com".into(),
            port: 21,
            user: user.map(str::to_owned),
            password: password.map(str::to_owned),
            root_dir: "/www".into(),
            path: "ios".into(),
        }
    }

    #[test]
    fn missing_user_logs_in_anonymously() {
        assert_eq!(
            credentials(&config(None, None)),
            (ANONYMOUS_USER, ANONYMOUS_PASSWORD)
        );
        assert_eq!(
            credentials(&config(Some("  "), Some("secret"))),
            (ANONYMOUS_USER, ANONYMOUS_PASSWORD)
        );
    }

    #[test]
    fn configured_user_is_used() {
        assert_eq!(
            credentials(&config(Some("ci"), Some("secret"))),
            ("ci", "secret")
        );
        assert_eq!(credentials(&config(Some("ci"), None)), ("ci", ""));
    }

    #[test]
    fn reply_codes_map_to_taxonomy() {
        assert_eq!(classify_reply(550), ReplyClass::NotFound);
        assert_eq!(classify_reply(450), ReplyClass::NotFound);
        assert_eq!(classify_reply(530), ReplyClass::Denied);
        assert_eq!(classify_reply(553), ReplyClass::Denied);
        assert_eq!(classify_reply(421), ReplyClass::Other);
    }

    #[test]
    fn unreachable_server_is_connection_error() {
        let mut cfg = config(None, None);
        cfg.host = "127.0.0.1".into();
        cfg.port = 1;
        let err = FtpStore::connect(&cfg, "https://h").err().expect("must fail");
        assert!(matches!(err, StoreError::Connection { .. }), "got: {err}");
    }
}
