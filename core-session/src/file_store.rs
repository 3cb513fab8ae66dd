//! File-backed preference store.
//!
//! Each key becomes one file under the configured data directory. Writes go
//! through a temporary file followed by a rename so a crash mid-write
//! leaves either the old value or the new one, never a torn file.

use crate::error::{Result, SessionError};
use crate::store::PreferenceStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// [`PreferenceStore`] persisting each key as a file.
pub struct FilePreferenceStore {
    dir: PathBuf,
}

impl FilePreferenceStore {
    /// Create a store rooted at `dir`. The directory is created on first
    /// write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        // Keys are short identifiers; anything path-like is a programming
        // error upstream.
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SessionError::Store(format!("Invalid preference key: {key:?}")));
        }
        Ok(self.dir.join(format!("{key}.pref")))
    }

    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::Store(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.ensure_dir().await?;
        let path = self.path_for(key)?;
        let tmp = path.with_extension("pref.tmp");

        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;

        debug!(key = key, path = %display_path(&path), "Preference written");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Store(e.to_string())),
        }
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
