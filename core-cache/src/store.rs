//! Transactional page application.
//!
//! The paging coordinator writes a fetched page and its continuation keys
//! together; on refresh it also discards the previous cache contents. All
//! of that must be one atomic step so a reader never observes a half
//! applied page. [`StoryStore`] owns the pool and executes the combined
//! write in a single transaction, reusing the row-level statements of the
//! repositories.

use crate::error::Result;
use crate::models::{RemoteKey, StoryRecord};
use crate::repositories::{remote_keys::upsert_remote_key, story::upsert_story};
use sqlx::SqlitePool;
use tracing::debug;

/// Atomic writer for remote page results.
#[derive(Clone)]
pub struct StoryStore {
    pool: SqlitePool,
}

impl StoryStore {
    /// Create a store over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Apply one fetched page: upsert stories and their continuation keys,
    /// optionally clearing the cache first (refresh), all in one
    /// transaction.
    pub async fn apply_remote_page(
        &self,
        clear_existing: bool,
        stories: &[StoryRecord],
        keys: &[RemoteKey],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if clear_existing {
            sqlx::query("DELETE FROM remote_keys").execute(&mut *tx).await?;
            sqlx::query("DELETE FROM stories").execute(&mut *tx).await?;
        }

        for key in keys {
            upsert_remote_key(&mut *tx, key).await?;
        }
        for story in stories {
            upsert_story(&mut *tx, story).await?;
        }

        tx.commit().await?;

        debug!(
            cleared = clear_existing,
            stories = stories.len(),
            "Applied remote page"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use crate::repositories::{
        PageRequest, RemoteKeyRepository, SqliteRemoteKeyRepository, SqliteStoryRepository,
        StoryRepository,
    };

    fn story(id: &str) -> StoryRecord {
        StoryRecord {
            id: id.to_string(),
            name: "Author".to_string(),
            description: "text".to_string(),
            photo_url: None,
            created_at: "2024-11-20T10:00:00Z".to_string(),
            lat: None,
            lon: None,
        }
    }

    fn key_for(id: &str, prev: Option<u32>, next: Option<u32>) -> RemoteKey {
        RemoteKey {
            story_id: id.to_string(),
            prev_key: prev,
            next_key: next,
        }
    }

    #[tokio::test]
    async fn test_apply_writes_both_tables() {
        let pool = create_test_pool().await.unwrap();
        let store = StoryStore::new(pool.clone());
        let stories = SqliteStoryRepository::new(pool.clone());
        let keys = SqliteRemoteKeyRepository::new(pool);

        store
            .apply_remote_page(
                false,
                &[story("s1"), story("s2")],
                &[key_for("s1", None, Some(2)), key_for("s2", None, Some(2))],
            )
            .await
            .unwrap();

        assert_eq!(stories.count().await.unwrap(), 2);
        assert_eq!(
            keys.for_story("s2").await.unwrap().unwrap().next_key,
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_refresh_discards_previous_contents() {
        let pool = create_test_pool().await.unwrap();
        let store = StoryStore::new(pool.clone());
        let stories = SqliteStoryRepository::new(pool.clone());
        let keys = SqliteRemoteKeyRepository::new(pool);

        store
            .apply_remote_page(false, &[story("old")], &[key_for("old", None, Some(2))])
            .await
            .unwrap();

        store
            .apply_remote_page(true, &[story("new")], &[key_for("new", None, Some(2))])
            .await
            .unwrap();

        let page = stories.read_page(PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "new");
        assert!(keys.for_story("old").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_page_application_is_a_no_op_write() {
        let pool = create_test_pool().await.unwrap();
        let store = StoryStore::new(pool.clone());
        let stories = SqliteStoryRepository::new(pool);

        store.apply_remote_page(false, &[], &[]).await.unwrap();
        assert_eq!(stories.count().await.unwrap(), 0);
    }
}
