//! # Local Cache Module
//!
//! Owns the on-device story cache and provides repository patterns for data
//! access.
//!
//! ## Overview
//!
//! This module manages:
//! - SQLite database schema and migrations
//! - Repository patterns for cached stories and paging continuation keys
//! - A transactional [`StoryStore`] used by the paging coordinator to apply
//!   remote pages atomically

pub mod db;
pub mod error;
pub mod models;
pub mod repositories;
pub mod store;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{CacheError, Result};
pub use models::{RemoteKey, StoryRecord};
pub use repositories::{
    PageRequest, RemoteKeyRepository, SqliteRemoteKeyRepository, SqliteStoryRepository,
    StoryRepository,
};
pub use store::StoryStore;
