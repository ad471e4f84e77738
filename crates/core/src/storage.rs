//! On-disk layout of uploaded files.
//!
//! Files live at `{base_dir}/{owner_registration}/{solicitation_id}/{file_name}`.
//! All operations are async wrappers over `tokio::fs`; no retries.

use std::io;
use std::path::{Path, PathBuf};

use crate::types::DbId;

/// Root directory holding every solicitation's files.
#[derive(Debug, Clone)]
pub struct FileArea {
    base_dir: PathBuf,
}

impl FileArea {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Folder of one solicitation.
    pub fn solicitation_dir(&self, owner_registration: &str, solicitation_id: DbId) -> PathBuf {
        self.base_dir
            .join(owner_registration)
            .join(solicitation_id.to_string())
    }

    pub async fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(dir).await
    }

    pub async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        tokio::fs::write(path, bytes).await
    }

    /// Delete a file. Returns `Ok(false)` if it did not exist.
    pub async fn remove_file(&self, path: &Path) -> io::Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Recursively delete a solicitation folder, logging instead of failing.
    ///
    /// Returns a warning message when the folder could not be removed. A
    /// folder that does not exist is not a failure.
    pub async fn remove_dir_best_effort(&self, dir: &Path) -> Option<String> {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), "Removed solicitation folder");
                None
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                let warning = format!("could not remove folder {}: {e}", dir.display());
                tracing::warn!(dir = %dir.display(), error = %e, "Folder removal failed");
                Some(warning)
            }
        }
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    pub async fn open(&self, path: &Path) -> io::Result<tokio::fs::File> {
        tokio::fs::File::open(path).await
    }
}
