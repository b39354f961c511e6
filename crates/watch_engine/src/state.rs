use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::NamedTempFile;
use watch_core::Fingerprint;
use watch_logging::{watch_debug, watch_info};

use crate::store::{ObjectStore, StoreError};

pub const DEFAULT_STATE_KEY: &str = "last_website_hash.txt";

/// Reads and writes the single persisted fingerprint under a fixed key.
#[derive(Clone)]
pub struct FingerprintStore {
    store: Arc<dyn ObjectStore>,
    key: String,
    staging_dir: Option<PathBuf>,
}

impl FingerprintStore {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            staging_dir: None,
        }
    }

    /// Stage values in `dir` instead of the system temp directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `Ok(None)` means no baseline exists yet. Unreadable or malformed
    /// values are errors, never "absent".
    pub async fn read_last_fingerprint(&self) -> Result<Option<Fingerprint>, StoreError> {
        let Some(bytes) = self.store.get(&self.key).await? else {
            watch_info!(
                "No fingerprint stored under {} in {}",
                self.key,
                self.store.describe()
            );
            return Ok(None);
        };
        let text = String::from_utf8(bytes).map_err(|err| StoreError::Corrupt {
            key: self.key.clone(),
            reason: err.to_string(),
        })?;
        let fingerprint = Fingerprint::parse(&text).map_err(|err| StoreError::Corrupt {
            key: self.key.clone(),
            reason: err.to_string(),
        })?;
        watch_debug!("Last fingerprint {} from {}", fingerprint.short(), self.store.describe());
        Ok(Some(fingerprint))
    }

    /// Replace the stored fingerprint. Writing the same value twice leaves the
    /// store unchanged.
    pub async fn write_fingerprint(&self, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        let staged = self.stage(fingerprint)?;
        self.store.put(&self.key, &staged).await?;
        watch_info!(
            "Stored fingerprint {} under {} in {}",
            fingerprint.short(),
            self.key,
            self.store.describe()
        );
        Ok(())
    }

    /// Round-trips the value through a scoped temp file; the file is removed
    /// when it goes out of scope on every path.
    fn stage(&self, fingerprint: &Fingerprint) -> Result<Vec<u8>, StoreError> {
        let staging = |err: std::io::Error| StoreError::Staging(err.to_string());
        let mut tmp = match &self.staging_dir {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new(),
        }
        .map_err(staging)?;

        let file = tmp.as_file_mut();
        file.write_all(fingerprint.as_str().as_bytes())
            .map_err(staging)?;
        file.flush().map_err(staging)?;
        file.seek(SeekFrom::Start(0)).map_err(staging)?;

        let mut staged = Vec::with_capacity(Fingerprint::HEX_LEN);
        file.read_to_end(&mut staged).map_err(staging)?;
        Ok(staged)
    }
}
