//! Story repository trait and SQLite implementation.

use crate::error::Result;
use crate::models::StoryRecord;
use crate::repositories::PageRequest;
use async_trait::async_trait;
use sqlx::{query_as, Sqlite, SqlitePool};
use tracing::debug;

/// Story cache interface.
///
/// The cache is an ordered keyed table: rows keep their insertion (rowid)
/// order, and upserting an existing id re-inserts it at the end of that
/// order, exactly like the replace-on-conflict cache it mirrors.
#[async_trait]
pub trait StoryRepository: Send + Sync {
    /// Insert stories, replacing any existing row with the same id.
    ///
    /// Runs in a single transaction: readers observe either none or all of
    /// the batch.
    async fn upsert_all(&self, stories: &[StoryRecord]) -> Result<()>;

    /// Read a key-ordered slice of the cache.
    ///
    /// Returns at most `limit` rows starting at the request's offset, in
    /// rowid order.
    async fn read_page(&self, request: PageRequest) -> Result<Vec<StoryRecord>>;

    /// Remove all cached stories.
    async fn clear(&self) -> Result<()>;

    /// Number of cached stories.
    async fn count(&self) -> Result<i64>;

    /// Look up a single story by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<StoryRecord>>;
}

/// Insert-or-replace one story on any executor (pool or open transaction).
pub(crate) async fn upsert_story<'e, E>(executor: E, story: &StoryRecord) -> sqlx::Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO stories (id, name, description, photo_url, created_at, lat, lon)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&story.id)
    .bind(&story.name)
    .bind(&story.description)
    .bind(&story.photo_url)
    .bind(&story.created_at)
    .bind(story.lat)
    .bind(story.lon)
    .execute(executor)
    .await
    .map(|_| ())
}

/// SQLite implementation of [`StoryRepository`].
pub struct SqliteStoryRepository {
    pool: SqlitePool,
}

impl SqliteStoryRepository {
    /// Create a new SQLite story repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoryRepository for SqliteStoryRepository {
    async fn upsert_all(&self, stories: &[StoryRecord]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for story in stories {
            upsert_story(&mut *tx, story).await?;
        }
        tx.commit().await?;

        debug!(count = stories.len(), "Upserted stories");
        Ok(())
    }

    async fn read_page(&self, request: PageRequest) -> Result<Vec<StoryRecord>> {
        let stories = query_as::<_, StoryRecord>(
            r#"
            SELECT id, name, description, photo_url, created_at, lat, lon
            FROM stories
            ORDER BY rowid
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(request.limit() as i64)
        .bind(request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(stories)
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM stories").execute(&self.pool).await?;
        debug!("Cleared story cache");
        Ok(())
    }

    async fn count(&self) -> Result<i64> {
        let (count,): (i64,) = query_as("SELECT COUNT(*) FROM stories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StoryRecord>> {
        let story = query_as::<_, StoryRecord>(
            r#"
            SELECT id, name, description, photo_url, created_at, lat, lon
            FROM stories
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(story)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;

    fn story(id: &str, description: &str) -> StoryRecord {
        StoryRecord {
            id: id.to_string(),
            name: format!("Author of {}", id),
            description: description.to_string(),
            photo_url: Some(format!("https://cdn.example.com/{}.jpg", id)),
            created_at: "2024-11-20T10:00:00Z".to_string(),
            lat: None,
            lon: None,
        }
    }

    async fn repository() -> SqliteStoryRepository {
        let pool = create_test_pool().await.unwrap();
        SqliteStoryRepository::new(pool)
    }

    #[tokio::test]
    async fn test_upsert_and_read_back() {
        let repo = repository().await;

        repo.upsert_all(&[story("s1", "first"), story("s2", "second")])
            .await
            .unwrap();

        let page = repo.read_page(PageRequest::new(0, 10)).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, "s1");
        assert_eq!(page[1].id, "s2");
    }

    #[tokio::test]
    async fn test_upsert_replaces_on_conflict() {
        let repo = repository().await;

        repo.upsert_all(&[story("s1", "original")]).await.unwrap();
        repo.upsert_all(&[story("s1", "revised")]).await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 1);
        let found = repo.find_by_id("s1").await.unwrap().unwrap();
        assert_eq!(found.description, "revised");
    }

    #[tokio::test]
    async fn test_replaced_row_moves_to_end_of_key_order() {
        let repo = repository().await;

        repo.upsert_all(&[story("s1", "a"), story("s2", "b"), story("s3", "c")])
            .await
            .unwrap();
        // Re-fetching s1 re-inserts it, so it now follows s3.
        repo.upsert_all(&[story("s1", "a2")]).await.unwrap();

        let page = repo.read_page(PageRequest::new(0, 10)).await.unwrap();
        let ids: Vec<&str> = page.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s3", "s1"]);
    }

    #[tokio::test]
    async fn test_read_page_respects_limit_and_offset() {
        let repo = repository().await;

        let stories: Vec<StoryRecord> =
            (1..=7).map(|i| story(&format!("s{}", i), "d")).collect();
        repo.upsert_all(&stories).await.unwrap();

        let first = repo.read_page(PageRequest::new(0, 3)).await.unwrap();
        assert_eq!(first.len(), 3);

        let second = repo.read_page(PageRequest::new(1, 3)).await.unwrap();
        assert_eq!(second.len(), 3);

        // Contiguous, order-preserving slices
        assert_eq!(first[2].id, "s3");
        assert_eq!(second[0].id, "s4");

        let last = repo.read_page(PageRequest::new(2, 3)).await.unwrap();
        assert_eq!(last.len(), 1, "Never more than limit, tail may be short");
    }

    #[tokio::test]
    async fn test_paged_reads_concatenate_to_full_scan() {
        let repo = repository().await;

        let stories: Vec<StoryRecord> =
            (1..=6).map(|i| story(&format!("s{}", i), "d")).collect();
        repo.upsert_all(&stories).await.unwrap();

        let mut concatenated = repo.read_page(PageRequest::new(0, 3)).await.unwrap();
        concatenated.extend(repo.read_page(PageRequest::new(1, 3)).await.unwrap());

        let full = repo.read_page(PageRequest::new(0, 100)).await.unwrap();
        assert_eq!(concatenated, full);
    }

    #[tokio::test]
    async fn test_clear() {
        let repo = repository().await;

        repo.upsert_all(&[story("s1", "a")]).await.unwrap();
        repo.clear().await.unwrap();

        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.find_by_id("s1").await.unwrap().is_none());
    }
}
