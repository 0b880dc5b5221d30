//! User repository
//!
//! Account rows for the local store backend. Emails are stored normalized
//! (trimmed, lowercase) and are unique.

use crate::db::DbPool;
use crate::models::{normalize_email, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;
use std::sync::Arc;
use uuid::Uuid;

use super::parse_uuid;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, user: &User) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Get user by email (case-insensitive)
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Check whether an email is already registered
    async fn exists_by_email(&self, email: &str) -> Result<bool>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, user: &User) -> Result<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user.id.to_string())
        .bind(normalize_email(&user.email))
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(self.pool.pool())
        .await
        .context("Failed to create user")?;

        Ok(user.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool.pool())
        .await
        .context("Failed to get user by ID")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(normalize_email(email))
        .fetch_optional(self.pool.pool())
        .await
        .context("Failed to get user by email")?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_one(self.pool.pool())
            .await
            .context("Failed to check email existence")?;

        Ok(count > 0)
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let id: String = row.get("id");
    Ok(User {
        id: parse_uuid(&id)?,
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    })
}
