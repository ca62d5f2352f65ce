//! Transient store for downloaded voice payloads.
//!
//! A payload is written to `<id>.ogg.part`, flushed and fsynced, then
//! renamed to `<id>.ogg`. Readers only ever look at the final name, so a
//! payload is either complete or absent.

use crate::error::TransientStoreError;
use async_trait::async_trait;
use chat_relay_core::TransientFileId;
use rootcause::prelude::Report;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

/// Handle to a stored payload.
///
/// Not `Clone`: releasing consumes the handle, so a payload is released
/// at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct TransientFile {
    id: TransientFileId,
}

impl TransientFile {
    /// Wraps the id of a payload a store has just written.
    #[must_use]
    pub fn new(id: TransientFileId) -> Self {
        Self { id }
    }

    /// Returns the payload id.
    #[must_use]
    pub fn id(&self) -> TransientFileId {
        self.id
    }

    /// Returns the file name the payload is stored under.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.ogg", self.id)
    }
}

/// Trait for scratch storage of downloaded payloads.
#[async_trait]
pub trait TransientStore: Send + Sync {
    /// Downloads `source_url` and stores the complete body.
    async fn materialize(&self, source_url: &str) -> Result<TransientFile, Report<TransientStoreError>>;

    /// Reads a stored payload back.
    async fn open_for_read(&self, file: &TransientFile) -> Result<Vec<u8>, Report<TransientStoreError>>;

    /// Deletes a stored payload.
    async fn release(&self, file: TransientFile) -> Result<(), Report<TransientStoreError>>;
}

/// Filesystem-backed transient store.
#[derive(Debug, Clone)]
pub struct FsTransientStore {
    dir: PathBuf,
    http: reqwest::Client,
}

impl FsTransientStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the download
    /// client cannot be built.
    pub async fn open(
        dir: impl Into<PathBuf>,
        download_timeout: Duration,
    ) -> Result<Self, Report<TransientStoreError>> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| TransientStoreError::DirectoryUnavailable {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
        let http = reqwest::Client::builder()
            .timeout(download_timeout)
            .build()
            .map_err(|e| TransientStoreError::DirectoryUnavailable {
                path: dir.display().to_string(),
                reason: format!("download client: {e}"),
            })?;
        Ok(Self { dir, http })
    }

    /// Returns the directory payloads are stored in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores an in-memory payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    pub async fn store(&self, bytes: &[u8]) -> Result<TransientFile, Report<TransientStoreError>> {
        let mut writer = PartialWrite::create(&self.dir).await?;
        if let Err(e) = writer.write(bytes).await {
            writer.abort().await;
            return Err(e);
        }
        writer.finish().await
    }

    fn path_of(&self, file: &TransientFile) -> PathBuf {
        self.dir.join(file.file_name())
    }
}

#[async_trait]
impl TransientStore for FsTransientStore {
    #[instrument(skip_all)]
    async fn materialize(&self, source_url: &str) -> Result<TransientFile, Report<TransientStoreError>> {
        let download_failed = |reason: String| TransientStoreError::DownloadFailed {
            url: redact(source_url),
            reason,
        };

        let mut response = self
            .http
            .get(source_url)
            .send()
            .await
            .map_err(|e| download_failed(e.without_url().to_string()))?;
        if !response.status().is_success() {
            return Err(download_failed(format!("HTTP {}", response.status())).into());
        }

        let mut writer = PartialWrite::create(&self.dir).await?;
        loop {
            let chunk = match response.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    writer.abort().await;
                    return Err(download_failed(e.without_url().to_string()).into());
                }
            };
            if let Err(e) = writer.write(&chunk).await {
                writer.abort().await;
                return Err(e);
            }
        }
        let file = writer.finish().await?;
        debug!(file = %file.id(), "payload materialized");
        Ok(file)
    }

    async fn open_for_read(&self, file: &TransientFile) -> Result<Vec<u8>, Report<TransientStoreError>> {
        let bytes = tokio::fs::read(self.path_of(file)).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                TransientStoreError::NotFound { id: file.id }
            } else {
                TransientStoreError::ReadFailed {
                    id: file.id,
                    reason: e.to_string(),
                }
            }
        })?;
        Ok(bytes)
    }

    async fn release(&self, file: TransientFile) -> Result<(), Report<TransientStoreError>> {
        tokio::fs::remove_file(self.path_of(&file))
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    TransientStoreError::NotFound { id: file.id }
                } else {
                    TransientStoreError::ReleaseFailed {
                        id: file.id,
                        reason: e.to_string(),
                    }
                }
            })?;
        debug!(file = %file.id, "payload released");
        Ok(())
    }
}

/// An in-progress write to `<id>.ogg.part`.
struct PartialWrite {
    id: TransientFileId,
    part_path: PathBuf,
    final_path: PathBuf,
    file: tokio::fs::File,
}

impl PartialWrite {
    async fn create(dir: &Path) -> Result<Self, Report<TransientStoreError>> {
        let id = TransientFileId::new();
        let final_path = dir.join(format!("{id}.ogg"));
        let part_path = dir.join(format!("{id}.ogg.part"));
        let file = tokio::fs::File::create(&part_path)
            .await
            .map_err(|e| TransientStoreError::WriteFailed {
                id,
                reason: e.to_string(),
            })?;
        Ok(Self {
            id,
            part_path,
            final_path,
            file,
        })
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), Report<TransientStoreError>> {
        let id = self.id;
        self.file
            .write_all(bytes)
            .await
            .map_err(|e| TransientStoreError::WriteFailed {
                id,
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn finish(mut self) -> Result<TransientFile, Report<TransientStoreError>> {
        let synced = match self.file.flush().await {
            Ok(()) => self.file.sync_all().await,
            Err(e) => Err(e),
        };
        if let Err(e) = synced {
            let err = self.write_failed(e);
            self.abort().await;
            return Err(err.into());
        }
        if let Err(e) = tokio::fs::rename(&self.part_path, &self.final_path).await {
            let err = self.write_failed(e);
            self.abort().await;
            return Err(err.into());
        }
        Ok(TransientFile::new(self.id))
    }

    async fn abort(self) {
        let Self {
            id, part_path, file, ..
        } = self;
        drop(file);
        if let Err(e) = tokio::fs::remove_file(&part_path).await
            && e.kind() != ErrorKind::NotFound
        {
            warn!(file = %id, error = %e, "failed to remove partial payload");
        }
    }

    fn write_failed(&self, e: std::io::Error) -> TransientStoreError {
        TransientStoreError::WriteFailed {
            id: self.id,
            reason: e.to_string(),
        }
    }
}

/// Keeps scheme and host only; download URLs embed the bot token.
fn redact(url: &str) -> String {
    match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            let host_end = rest.find('/').unwrap_or(rest.len());
            format!("{}{}", &url[..scheme_end + 3], &rest[..host_end])
        }
        None => "<redacted>".to_string(),
    }
}
