//! Service configuration.
//!
//! One explicit config object per concern, bundled here for the façade.
//! Hosts construct a [`ServiceConfig`] with a data directory and adjust the
//! parts they care about; nothing is read from ambient globals.

use core_api::ApiConfig;
use core_cache::DatabaseConfig;
use core_paging::PagingConfig;
use std::path::{Path, PathBuf};

/// Configuration for [`StoryService`](crate::StoryService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory for the database and persisted preferences.
    pub data_dir: PathBuf,
    /// Remote API configuration.
    pub api: ApiConfig,
    /// Database pool configuration.
    pub database: DatabaseConfig,
    /// Feed paging configuration.
    pub paging: PagingConfig,
    /// Event bus buffer size.
    pub event_buffer: usize,
}

impl ServiceConfig {
    /// Create a configuration rooted at `data_dir`, with the database file
    /// placed inside it.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let database = DatabaseConfig::new(data_dir.join("stories.db"));

        Self {
            data_dir,
            api: ApiConfig::default(),
            database,
            paging: PagingConfig::default(),
            event_buffer: 100,
        }
    }

    /// Set the remote API configuration
    pub fn api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }

    /// Set the database configuration
    pub fn database(mut self, database: DatabaseConfig) -> Self {
        self.database = database;
        self
    }

    /// Set the paging configuration
    pub fn paging(mut self, paging: PagingConfig) -> Self {
        self.paging = paging;
        self
    }

    /// Directory where preferences are persisted.
    pub fn preferences_dir(&self) -> PathBuf {
        self.data_dir.join("prefs")
    }

    /// The configured data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_paths() {
        let config = ServiceConfig::new("/tmp/story-app");
        assert_eq!(config.data_dir(), Path::new("/tmp/story-app"));
        assert_eq!(config.preferences_dir(), Path::new("/tmp/story-app/prefs"));
        assert!(config.database.database_url.ends_with("stories.db"));
    }

    #[test]
    fn test_config_builders() {
        let config = ServiceConfig::new("/tmp/story-app")
            .database(DatabaseConfig::in_memory())
            .paging(PagingConfig::default().page_size(10));

        assert_eq!(config.database.database_url, "sqlite::memory:");
        assert_eq!(config.paging.page_size, 10);
    }
}
