//! Session repository
//!
//! Session rows for the local store backend. A row is keyed by its access
//! token and carries the paired refresh token; lookups join the owning user
//! so callers get a complete [`Session`].

use crate::db::DbPool;
use crate::models::{Session, UserIdentity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::sync::Arc;

use super::parse_uuid;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Persist a new session
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by access token
    async fn get_by_access_token(&self, access_token: &str) -> Result<Option<Session>>;

    /// Move the expiry of a session; returns false when no row matched
    async fn extend(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool>;

    /// Delete a session
    async fn delete(&self, access_token: &str) -> Result<()>;

    /// Delete expired sessions
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: DbPool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        sqlx::query(
            r#"
            INSERT INTO sessions (access_token, refresh_token, user_id, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.access_token)
        .bind(&session.refresh_token)
        .bind(session.user.id.to_string())
        .bind(session.expires_at)
        .bind(Utc::now())
        .execute(self.pool.pool())
        .await
        .context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get_by_access_token(&self, access_token: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT s.access_token, s.refresh_token, s.expires_at, u.id AS user_id, u.email
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.access_token = ?
            "#,
        )
        .bind(access_token)
        .fetch_optional(self.pool.pool())
        .await
        .context("Failed to get session by access token")?;

        row.as_ref().map(row_to_session).transpose()
    }

    async fn extend(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE sessions SET expires_at = ? WHERE access_token = ? AND refresh_token = ?",
        )
        .bind(expires_at)
        .bind(access_token)
        .bind(refresh_token)
        .execute(self.pool.pool())
        .await
        .context("Failed to extend session")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, access_token: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE access_token = ?")
            .bind(access_token)
            .execute(self.pool.pool())
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<i64> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(Utc::now())
            .execute(self.pool.pool())
            .await
            .context("Failed to delete expired sessions")?;

        Ok(result.rows_affected() as i64)
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    let user_id: String = row.get("user_id");
    Ok(Session {
        user: UserIdentity {
            id: parse_uuid(&user_id)?,
            email: row.get("email"),
        },
        access_token: row.get("access_token"),
        refresh_token: row.get("refresh_token"),
        expires_at: row.get("expires_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::Duration;

    async fn setup_test_repo() -> (DbPool, SqlxSessionRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxSessionRepository::new(pool.clone());
        (pool, repo)
    }

    // Sessions reference users, so every test needs an account first
    async fn create_test_user(pool: &DbPool, email: &str) -> User {
        let user = User::new(email, "hash");
        SqlxUserRepository::new(pool.clone())
            .create(&user)
            .await
            .expect("Failed to create test user");
        user
    }

    fn create_test_session(user: &User, expires_in_days: i64) -> Session {
        Session {
            user: user.identity(),
            access_token: Uuid::new_v4().simple().to_string(),
            refresh_token: Uuid::new_v4().simple().to_string(),
            expires_at: Utc::now() + Duration::days(expires_in_days),
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (pool, repo) = setup_test_repo().await;
        let user = create_test_user(&pool, "asha@example.com").await;

        let session = create_test_session(&user, 7);
        repo.create(&session).await.expect("Failed to create session");

        let found = repo
            .get_by_access_token(&session.access_token)
            .await
            .expect("Failed to get session")
            .expect("Session not found");

        assert_eq!(found.user, user.identity());
        assert_eq!(found.refresh_token, session.refresh_token);
    }

    #[tokio::test]
    async fn test_get_session_not_found() {
        let (_pool, repo) = setup_test_repo().await;

        let found = repo
            .get_by_access_token("nonexistent-token")
            .await
            .expect("Failed to get session");

        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_extend_requires_matching_refresh_token() {
        let (pool, repo) = setup_test_repo().await;
        let user = create_test_user(&pool, "asha@example.com").await;
        let session = create_test_session(&user, 1);
        repo.create(&session).await.unwrap();

        let later = Utc::now() + Duration::days(7);
        assert!(!repo
            .extend(&session.access_token, "wrong-refresh", later)
            .await
            .unwrap());
        assert!(repo
            .extend(&session.access_token, &session.refresh_token, later)
            .await
            .unwrap());

        let found = repo
            .get_by_access_token(&session.access_token)
            .await
            .unwrap()
            .unwrap();
        assert!(found.expires_at > session.expires_at);
    }

    #[tokio::test]
    async fn test_delete_session() {
        let (pool, repo) = setup_test_repo().await;
        let user = create_test_user(&pool, "asha@example.com").await;
        let session = create_test_session(&user, 7);
        repo.create(&session).await.unwrap();

        repo.delete(&session.access_token)
            .await
            .expect("Failed to delete session");

        assert!(repo
            .get_by_access_token(&session.access_token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let (pool, repo) = setup_test_repo().await;
        let user = create_test_user(&pool, "asha@example.com").await;

        let expired = create_test_session(&user, -1);
        let valid = create_test_session(&user, 7);
        repo.create(&expired).await.unwrap();
        repo.create(&valid).await.unwrap();

        let deleted = repo.delete_expired().await.expect("Failed to delete expired");
        assert_eq!(deleted, 1);

        assert!(repo.get_by_access_token(&expired.access_token).await.unwrap().is_none());
        assert!(repo.get_by_access_token(&valid.access_token).await.unwrap().is_some());
    }
}
