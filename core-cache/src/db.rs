//! # Database Connection Pool Module
//!
//! Provides SQLite connection pooling with a configuration suited to a
//! single-process, single-user cache.
//!
//! ## Features
//!
//! - **WAL Mode**: multiple readers proceed while one writer commits
//! - **Connection Pooling**: configurable min/max connections with timeouts
//! - **Foreign Keys**: enforced
//! - **Automatic Migrations**: embedded, run on initialization
//! - **Health Checks**: connection validation before handing out the pool
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_cache::db::{DatabaseConfig, create_pool};
//!
//! let config = DatabaseConfig::new("stories.db");
//! let pool = create_pool(config).await?;
//! ```
//!
//! For tests, use in-memory databases via `create_test_pool()`.

use crate::error::{CacheError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database configuration for the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or `:memory:` for an in-memory database
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    ///
    /// In-memory SQLite databases exist per connection, so the pool is
    /// capped at a single connection; everything serializes through it.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Set the minimum number of connections
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// This function configures connection options (WAL mode, foreign keys),
/// creates the pool, runs the embedded migrations, and performs a health
/// check.
///
/// # Errors
///
/// Returns an error if the database file cannot be accessed, pool creation
/// fails, migrations fail, or the health check fails.
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(CacheError::Database)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            CacheError::Database(e)
        })?;

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// Create a connection pool for testing with an in-memory database,
/// migrations already applied.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

/// Apply all pending migrations embedded from `migrations/`.
async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    debug!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            CacheError::Migration(e.to_string())
        })?;

    Ok(())
}

/// Verify the database answers a trivial query.
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        CacheError::Database(e)
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_in_memory_pool() {
        let pool = create_pool(DatabaseConfig::in_memory()).await;
        assert!(pool.is_ok(), "Should create in-memory pool successfully");
    }

    #[tokio::test]
    async fn test_database_config_builder() {
        let config = DatabaseConfig::in_memory()
            .min_connections(2)
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(60));

        assert_eq!(config.min_connections, 2);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.acquire_timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = create_test_pool().await.unwrap();

        let result: (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='stories'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(result.0, 1, "Stories table should exist");

        let result: (i32,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='remote_keys'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(result.0, 1, "Remote keys table should exist");
    }

    #[tokio::test]
    async fn test_concurrent_queries() {
        let pool = create_test_pool().await.unwrap();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let pool = pool.clone();
                tokio::spawn(async move {
                    sqlx::query("SELECT 1").fetch_one(&pool).await.unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }
    }
}
