//! Paging continuation key repository.
//!
//! One row per cached story, recording the previous/next page indexes
//! around the page that story arrived on. The coordinator consults the
//! newest row to resume pagination after a restart.

use crate::error::Result;
use crate::models::RemoteKey;
use async_trait::async_trait;
use sqlx::{query_as, Sqlite, SqlitePool};

/// Continuation key persistence.
#[async_trait]
pub trait RemoteKeyRepository: Send + Sync {
    /// Insert keys, replacing any existing row with the same story id.
    async fn insert_all(&self, keys: &[RemoteKey]) -> Result<()>;

    /// Key row for one story.
    async fn for_story(&self, story_id: &str) -> Result<Option<RemoteKey>>;

    /// Key row of the most recently cached story, if any.
    async fn latest(&self) -> Result<Option<RemoteKey>>;

    /// Remove all keys.
    async fn clear(&self) -> Result<()>;
}

/// Insert-or-replace one key row on any executor (pool or open transaction).
pub(crate) async fn upsert_remote_key<'e, E>(executor: E, key: &RemoteKey) -> sqlx::Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO remote_keys (story_id, prev_key, next_key)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(&key.story_id)
    .bind(key.prev_key)
    .bind(key.next_key)
    .execute(executor)
    .await
    .map(|_| ())
}

/// SQLite implementation of [`RemoteKeyRepository`].
pub struct SqliteRemoteKeyRepository {
    pool: SqlitePool,
}

impl SqliteRemoteKeyRepository {
    /// Create a new SQLite remote key repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RemoteKeyRepository for SqliteRemoteKeyRepository {
    async fn insert_all(&self, keys: &[RemoteKey]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for key in keys {
            upsert_remote_key(&mut *tx, key).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn for_story(&self, story_id: &str) -> Result<Option<RemoteKey>> {
        let key = query_as::<_, RemoteKey>(
            "SELECT story_id, prev_key, next_key FROM remote_keys WHERE story_id = ?",
        )
        .bind(story_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn latest(&self) -> Result<Option<RemoteKey>> {
        let key = query_as::<_, RemoteKey>(
            "SELECT story_id, prev_key, next_key FROM remote_keys ORDER BY rowid DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM remote_keys")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
