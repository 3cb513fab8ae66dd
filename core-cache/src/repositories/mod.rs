//! Repository traits and SQLite implementations for the story cache.

pub mod pagination;
pub mod remote_keys;
pub mod story;

pub use pagination::PageRequest;
pub use remote_keys::{RemoteKeyRepository, SqliteRemoteKeyRepository};
pub use story::{SqliteStoryRepository, StoryRepository};
