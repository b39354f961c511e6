use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use tempfile::NamedTempFile;
use url::Url;
use watch_core::Fingerprint;
use watch_logging::watch_debug;

use crate::config::ConfigError;

/// Largest object either store will hand back. The only value kept is a
/// fingerprint, so anything bigger is not one.
pub const DEFAULT_MAX_OBJECT_BYTES: u64 = 4 * Fingerprint::HEX_LEN as u64;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    #[error("permission denied for {key}: {message}")]
    PermissionDenied { key: String, message: String },
    #[error("stored value under {key} is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("invalid object key {0:?}")]
    InvalidKey(String),
    #[error("failed to stage value: {0}")]
    Staging(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

fn too_large(key: &str, max_bytes: u64) -> StoreError {
    StoreError::Corrupt {
        key: key.to_string(),
        reason: format!("object is larger than {max_bytes} bytes"),
    }
}

/// Key-value object store holding opaque byte objects.
///
/// `get` answers `Ok(None)` only when the object does not exist; every other
/// failure is an error.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    /// Human readable location, for logs.
    fn describe(&self) -> String;
}

/// One file per key inside a root directory. Writes go to a temp file in the
/// same directory and are renamed over the target, so readers never see a
/// partial object.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
    max_object_bytes: u64,
}

fn check_fs_key(key: &str) -> Result<(), StoreError> {
    let invalid = key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\'])
        || key.contains('\0');
    if invalid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
        }
    }

    pub fn with_max_object_bytes(mut self, max_bytes: u64) -> Self {
        self.max_object_bytes = max_bytes;
        self
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        check_fs_key(key)?;
        Ok(self.root.join(key))
    }

    fn ensure_root(&self) -> Result<(), StoreError> {
        match fs::metadata(&self.root) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StoreError::Unavailable(format!(
                "{} is not a directory",
                self.root.display()
            ))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => fs::create_dir_all(&self.root)
                .map_err(|err| StoreError::Unavailable(err.to_string())),
            Err(err) => Err(StoreError::Unavailable(err.to_string())),
        }
    }
}

fn map_io(key: &str, err: io::Error) -> StoreError {
    match err.kind() {
        io::ErrorKind::PermissionDenied => StoreError::PermissionDenied {
            key: key.to_string(),
            message: err.to_string(),
        },
        _ => StoreError::Io(err),
    }
}

#[async_trait::async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.object_path(key)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() && meta.len() > self.max_object_bytes => {
                return Err(too_large(key, self.max_object_bytes));
            }
            Ok(_) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                watch_debug!("No object at {:?}", path);
                return Ok(None);
            }
            Err(err) => return Err(map_io(key, err)),
        }
        fs::read(&path).map(Some).map_err(|err| map_io(key, err))
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.object_path(key)?;
        self.ensure_root()?;

        let mut staged = NamedTempFile::new_in(&self.root).map_err(|err| map_io(key, err))?;
        staged.write_all(bytes).map_err(|err| map_io(key, err))?;
        staged.flush().map_err(|err| map_io(key, err))?;
        staged
            .as_file_mut()
            .sync_all()
            .map_err(|err| map_io(key, err))?;
        // `persist` replaces an existing target in one rename.
        staged
            .persist(&target)
            .map_err(|err| map_io(key, err.error))?;

        watch_debug!("Wrote {} bytes to {:?}", bytes.len(), target);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("dir({})", self.root.display())
    }
}

/// Objects addressed as `{base}/{key}`, read with GET and written with PUT.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    base: Url,
    client: reqwest::Client,
    max_object_bytes: u64,
}

impl HttpObjectStore {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(Self {
            base: with_trailing_slash(base),
            client,
            max_object_bytes: DEFAULT_MAX_OBJECT_BYTES,
        })
    }

    pub fn with_max_object_bytes(mut self, max_bytes: u64) -> Self {
        self.max_object_bytes = max_bytes;
        self
    }

    /// Each `/`-separated part of the key becomes one percent-encoded path
    /// segment under the base.
    fn object_url(&self, key: &str) -> Result<Url, StoreError> {
        check_http_key(key)?;
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::InvalidKey(key.to_string()))?
            .pop_if_empty()
            .extend(key.split('/'));
        Ok(url)
    }

    fn status_error(key: &str, status: StatusCode) -> StoreError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::PermissionDenied {
                key: key.to_string(),
                message: status.to_string(),
            },
            _ => StoreError::Unavailable(format!("http status {}", status.as_u16())),
        }
    }
}

fn check_http_key(key: &str) -> Result<(), StoreError> {
    let invalid = key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if invalid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait::async_trait]
impl ObjectStore for HttpObjectStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let url = self.object_url(key)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            watch_debug!("No object at {}", url);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::status_error(key, status));
        }
        if response
            .content_length()
            .is_some_and(|len| len > self.max_object_bytes)
        {
            return Err(too_large(key, self.max_object_bytes));
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| StoreError::Unavailable(err.to_string()))?;
            if bytes.len() as u64 + chunk.len() as u64 > self.max_object_bytes {
                return Err(too_large(key, self.max_object_bytes));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(Some(bytes))
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let url = self.object_url(key)?;
        let response = self
            .client
            .put(url.clone())
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(key, status));
        }
        watch_debug!("Stored {} bytes at {}", bytes.len(), url);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("http({})", self.base)
    }
}

/// Where the fingerprint lives: a local directory or an HTTP object endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Directory(PathBuf),
    Http(Url),
}

impl StoreLocation {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::EmptyStoreLocation);
        }
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(raw).map_err(|err| ConfigError::InvalidUrl {
                field: "store location",
                value: raw.to_string(),
                message: err.to_string(),
            })?;
            return Ok(Self::Http(url));
        }
        Ok(Self::Directory(PathBuf::from(raw)))
    }

    /// Rejects keys this location could never address.
    pub fn check_key(&self, key: &str) -> Result<(), StoreError> {
        match self {
            StoreLocation::Directory(_) => check_fs_key(key),
            StoreLocation::Http(_) => check_http_key(key),
        }
    }

    pub fn open(&self, timeout: Duration) -> Result<Arc<dyn ObjectStore>, StoreError> {
        match self {
            StoreLocation::Directory(root) => Ok(Arc::new(FsObjectStore::new(root.clone()))),
            StoreLocation::Http(base) => Ok(Arc::new(HttpObjectStore::new(base.clone(), timeout)?)),
        }
    }
}
