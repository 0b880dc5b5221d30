//! Hosted message table client
//!
//! Rows live in `{store.url}/rest/v1/{table}`. Requests are sent with the
//! signed-in user's access token, so the table's row-level policies decide
//! what the user may read and write.

use async_trait::async_trait;

use super::{read_failure, trim_base};
use crate::models::{ChatMessage, NewChatMessage, Session};
use crate::stores::{MessageStore, StoreError};

pub struct HostedMessageStore {
    client: reqwest::Client,
    table_url: String,
    anon_key: String,
}

impl HostedMessageStore {
    pub fn new(
        client: reqwest::Client,
        store_url: &str,
        anon_key: impl Into<String>,
        table: &str,
    ) -> Self {
        Self {
            client,
            table_url: format!("{}/rest/v1/{}", trim_base(store_url), table),
            anon_key: anon_key.into(),
        }
    }

    async fn rejected(response: reqwest::Response) -> StoreError {
        let (status, message) = read_failure(response).await;
        StoreError::Rejected { status, message }
    }
}

fn unavailable(e: reqwest::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl MessageStore for HostedMessageStore {
    async fn list_for_user(&self, session: &Session) -> Result<Vec<ChatMessage>, StoreError> {
        let user_filter = format!("eq.{}", session.user.id);
        let response = self
            .client
            .get(&self.table_url)
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
            ])
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        response
            .json::<Vec<ChatMessage>>()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Malformed message rows: {}", e)))
    }

    async fn insert(
        &self,
        session: &Session,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StoreError> {
        let response = self
            .client
            .post(&self.table_url)
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(&session.access_token)
            .json(&message)
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        let rows = response
            .json::<Vec<ChatMessage>>()
            .await
            .map_err(|e| StoreError::Unavailable(format!("Malformed inserted row: {}", e)))?;

        rows.into_iter().next().ok_or_else(|| StoreError::Rejected {
            status: 200,
            message: "Insert returned no row".to_string(),
        })
    }
}
