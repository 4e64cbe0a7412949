use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use crate::error::AppError;

/// Scratch directory where uploads are spooled before analysis.
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    max_bytes: usize,
}

/// An upload being written to disk. The file is removed when this is dropped,
/// whichever way the request ends.
pub struct StagedUpload {
    // closed before the path is removed
    file: tokio::fs::File,
    path: TempPath,
    written: usize,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Opens a uniquely named scratch file. Names carry a timestamp plus a random suffix so
    /// concurrent requests never collide.
    pub async fn create(&self, extension: Option<&str>) -> Result<StagedUpload, AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let prefix = format!("upload-{}-", chrono::Utc::now().format("%Y%m%d%H%M%S%3f"));
        let suffix = extension
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();

        let named = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.dir)?;
        let (file, path) = named.into_parts();
        log::debug!("staging upload at {}", path.display());

        Ok(StagedUpload {
            file: tokio::fs::File::from_std(file),
            path,
            written: 0,
            max_bytes: self.max_bytes,
        })
    }
}

impl StagedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), AppError> {
        if self.written + chunk.len() > self.max_bytes {
            return Err(AppError::InvalidUpload(format!(
                "image exceeds {} bytes",
                self.max_bytes
            )));
        }
        self.file.write_all(chunk).await?;
        self.written += chunk.len();
        Ok(())
    }

    /// Reads the spooled bytes back and deletes the scratch file.
    pub async fn into_bytes(mut self) -> Result<Vec<u8>, AppError> {
        self.file.flush().await?;
        let bytes = tokio::fs::read(&self.path).await?;
        Ok(bytes)
    }
}
