//! Message repository
//!
//! Local implementation of [`MessageStore`]. Reads and writes are scoped to
//! the user of the session passed in, mirroring the row-level policy the
//! hosted table enforces.

use crate::db::DbPool;
use crate::models::{ChatMessage, NewChatMessage, Session};
use crate::stores::{MessageStore, StoreError};
use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use std::sync::Arc;

use super::parse_uuid;

/// SQLx-based message store
pub struct SqlxMessageRepository {
    pool: DbPool,
}

impl SqlxMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a boxed store for use with dependency injection
    pub fn boxed(pool: DbPool) -> Arc<dyn MessageStore> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl MessageStore for SqlxMessageRepository {
    async fn list_for_user(&self, session: &Session) -> Result<Vec<ChatMessage>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, message, response, created_at
            FROM messages
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(session.user.id.to_string())
        .fetch_all(self.pool.pool())
        .await
        .context("Failed to list messages")?;

        let messages = rows
            .iter()
            .map(row_to_message)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(messages)
    }

    async fn insert(
        &self,
        session: &Session,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        if message.user_id != session.user.id {
            return Err(StoreError::Rejected {
                status: 403,
                message: "new row violates row-level security policy".to_string(),
            });
        }

        let created_at = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO messages (user_id, message, response, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(message.user_id.to_string())
        .bind(&message.message)
        .bind(&message.response)
        .bind(created_at)
        .execute(self.pool.pool())
        .await
        .context("Failed to insert message")?;

        Ok(ChatMessage {
            id: result.last_insert_rowid(),
            user_id: message.user_id,
            message: message.message,
            response: message.response,
            created_at,
        })
    }
}

fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<ChatMessage> {
    let user_id: String = row.get("user_id");
    Ok(ChatMessage {
        id: row.get("id"),
        user_id: parse_uuid(&user_id)?,
        message: row.get("message"),
        response: row.get("response"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use chrono::Duration;
    use uuid::Uuid;

    async fn setup() -> (DbPool, SqlxMessageRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        (pool.clone(), SqlxMessageRepository::new(pool))
    }

    async fn session_for(pool: &DbPool, email: &str) -> Session {
        let user = User::new(email, "hash");
        SqlxUserRepository::new(pool.clone())
            .create(&user)
            .await
            .unwrap();
        Session {
            user: user.identity(),
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    fn new_message(session: &Session, text: &str) -> NewChatMessage {
        NewChatMessage {
            message: text.to_string(),
            response: "placeholder".to_string(),
            user_id: session.user.id,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamp() {
        let (pool, repo) = setup().await;
        let session = session_for(&pool, "asha@example.com").await;

        let stored = repo
            .insert(&session, new_message(&session, "What is Vata?"))
            .await
            .expect("Failed to insert");

        assert!(stored.id > 0);
        assert_eq!(stored.user_id, session.user.id);
        assert_eq!(stored.message, "What is Vata?");
        assert_eq!(stored.response, "placeholder");
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (pool, repo) = setup().await;
        let session = session_for(&pool, "asha@example.com").await;

        for text in ["first", "second", "third"] {
            repo.insert(&session, new_message(&session, text)).await.unwrap();
        }

        let messages = repo.list_for_user(&session).await.unwrap();
        let texts: Vec<_> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["third", "second", "first"]);
    }

    #[tokio::test]
    async fn test_list_only_returns_own_rows() {
        let (pool, repo) = setup().await;
        let asha = session_for(&pool, "asha@example.com").await;
        let ravi = session_for(&pool, "ravi@example.com").await;

        repo.insert(&asha, new_message(&asha, "mine")).await.unwrap();
        repo.insert(&ravi, new_message(&ravi, "theirs")).await.unwrap();

        let messages = repo.list_for_user(&asha).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "mine");
    }

    #[tokio::test]
    async fn test_insert_for_other_user_rejected() {
        let (pool, repo) = setup().await;
        let session = session_for(&pool, "asha@example.com").await;

        let mut message = new_message(&session, "spoofed");
        message.user_id = Uuid::new_v4();

        let err = repo.insert(&session, message).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 403, .. }));
        assert!(repo.list_for_user(&session).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_history() {
        let (pool, repo) = setup().await;
        let session = session_for(&pool, "asha@example.com").await;

        assert!(repo.list_for_user(&session).await.unwrap().is_empty());
    }
}
