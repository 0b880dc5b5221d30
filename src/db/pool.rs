//! Database connection pool
//!
//! The local store backend keeps users, sessions and chat messages in a
//! single SQLite file. File-based URLs get their parent directory created and
//! `mode=rwc` appended so a fresh deployment starts without manual setup.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

use crate::config::DatabaseConfig;

/// SQLite connection pool
pub struct SqliteDatabase {
    pool: SqlitePool,
}

/// Shared handle passed to repositories
pub type DbPool = Arc<SqliteDatabase>;

impl SqliteDatabase {
    /// Open (and create if needed) the database at `url`
    pub async fn new(url: &str) -> Result<Self> {
        let in_memory = is_memory_url(url);

        if !in_memory {
            let path = url.trim_start_matches("sqlite:");
            let path = path.split('?').next().unwrap_or(path);
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create database directory: {:?}", parent)
                    })?;
                }
            }
        }

        let connection_url = connection_url(url);

        // Every connection to `sqlite::memory:` opens its own empty database,
        // so an in-memory pool is pinned to one long-lived connection.
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(20)
        };

        let pool = options
            .connect(&connection_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database: {}", url))?;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .context("Failed to enable foreign keys")?;

        Ok(Self { pool })
    }

    /// Get a reference to the underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Execute a raw SQL statement that doesn't return rows
    pub async fn execute(&self, query: &str) -> Result<u64> {
        let result = sqlx::query(query)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to execute query: {}", query))?;
        Ok(result.rows_affected())
    }
}

fn is_memory_url(url: &str) -> bool {
    url == ":memory:" || url.starts_with("sqlite::memory:")
}

fn connection_url(url: &str) -> String {
    if url == ":memory:" {
        "sqlite::memory:".to_string()
    } else if url.starts_with("sqlite:") {
        if url.contains('?') || is_memory_url(url) {
            url.to_string()
        } else {
            format!("{}?mode=rwc", url)
        }
    } else {
        format!("sqlite:{}?mode=rwc", url)
    }
}

/// Create a database pool from configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool> {
    let db = SqliteDatabase::new(&config.url).await?;
    Ok(Arc::new(db))
}

/// Create an in-memory database pool for tests
pub async fn create_test_pool() -> Result<DbPool> {
    let config = DatabaseConfig {
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_url() {
        assert_eq!(connection_url(":memory:"), "sqlite::memory:");
        assert_eq!(connection_url("data/app.db"), "sqlite:data/app.db?mode=rwc");
        assert_eq!(connection_url("sqlite:data/app.db"), "sqlite:data/app.db?mode=rwc");
        assert_eq!(connection_url("sqlite:app.db?mode=ro"), "sqlite:app.db?mode=ro");
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(pool.pool())
            .await
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[tokio::test]
    async fn test_memory_pool_keeps_state_between_queries() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE scratch (id INTEGER)").await.unwrap();
        pool.execute("INSERT INTO scratch (id) VALUES (1)").await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scratch")
            .fetch_one(pool.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ayunetra.db");
        let config = DatabaseConfig {
            url: path.display().to_string(),
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        pool.execute("CREATE TABLE scratch (id INTEGER)").await.unwrap();
        assert!(path.exists());
    }
}
