//! The upload directory: a flat folder of images keyed by opaque stored names.
//!
//! Only the handlers in this crate touch it. Names coming back from clients
//! are checked by [`Storage::resolve`] before any path is built, so a request
//! can never reach outside the directory.
//!
//! Writes go through a [`tempfile::NamedTempFile`] created inside the same
//! directory and are renamed into place, so a failed or interrupted upload
//! never leaves a truncated image behind under its final name.

use crate::error::ImgPdfError;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// An image persisted in the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Generated name the client echoes back in later requests.
    pub name: String,
    pub size: u64,
}

/// Handle to the upload directory. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Open the upload directory, creating it if missing.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, ImgPdfError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|source| ImgPdfError::Io {
                path: root.clone(),
                source,
            })?;
        debug!("Upload directory ready: {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a stored name to its path.
    ///
    /// Names that could not have been generated by an upload (empty, dot
    /// entries, anything with a path separator) are reported as not found.
    pub fn resolve(&self, name: &str) -> Result<PathBuf, ImgPdfError> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !plain {
            return Err(ImgPdfError::NotFound {
                name: name.to_string(),
            });
        }
        Ok(self.root.join(name))
    }

    /// Write `bytes` under `name`, replacing nothing: names are fresh per upload.
    pub async fn save(&self, name: &str, bytes: Vec<u8>) -> Result<StoredImage, ImgPdfError> {
        let path = self.resolve(name)?;
        let root = self.root.clone();
        let size = bytes.len() as u64;

        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = NamedTempFile::new_in(&root)?;
            tmp.write_all(&bytes)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| ImgPdfError::Internal(format!("Save task panicked: {}", e)))?
        .map_err(|source| ImgPdfError::Io { path, source })?;

        debug!("Stored {} ({} bytes)", name, size);
        Ok(StoredImage {
            name: name.to_string(),
            size,
        })
    }

    /// Read a stored file. Absent files yield [`ImgPdfError::NotFound`].
    pub async fn read(&self, name: &str) -> Result<Vec<u8>, ImgPdfError> {
        let path = self.resolve(name)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| ImgPdfError::from_io(name, path, e))
    }

    #[cfg(test)]
    pub(crate) async fn contains(&self, name: &str) -> bool {
        match self.resolve(name) {
            Ok(path) => tokio::fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Delete a stored file. Absent files yield [`ImgPdfError::NotFound`].
    pub async fn remove(&self, name: &str) -> Result<(), ImgPdfError> {
        let path = self.resolve(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| ImgPdfError::from_io(name, path, e))?;
        debug!("Removed {}", name);
        Ok(())
    }

    /// Delete every file whose modification time is older than `max_age`.
    ///
    /// Returns the number of files removed. Entries that vanish or cannot be
    /// inspected mid-sweep are logged and skipped.
    pub async fn sweep_stale(&self, max_age: Duration) -> Result<usize, ImgPdfError> {
        let mut entries =
            tokio::fs::read_dir(&self.root)
                .await
                .map_err(|source| ImgPdfError::Io {
                    path: self.root.clone(),
                    source,
                })?;

        let now = SystemTime::now();
        let mut removed = 0;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(source) => {
                    return Err(ImgPdfError::Io {
                        path: self.root.clone(),
                        source,
                    })
                }
            };

            let path = entry.path();
            let modified = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta.modified(),
                Ok(_) => continue,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };

            let age = match modified {
                Ok(t) => now.duration_since(t).unwrap_or_default(),
                Err(e) => {
                    warn!("No mtime for {}: {}", path.display(), e);
                    continue;
                }
            };

            if age > max_age {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!("Failed to sweep {}: {}", path.display(), e),
                }
            }
        }

        if removed > 0 {
            info!("Swept {} stale upload(s) from {}", removed, self.root.display());
        }
        Ok(removed)
    }
}
