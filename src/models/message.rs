//! Chat message model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored message/response pair. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Store-assigned identifier
    pub id: i64,
    /// Owner; always the identity of the session that created the row
    pub user_id: Uuid,
    /// Text the user sent
    pub message: String,
    /// Generated reply
    pub response: String,
    /// Store-assigned creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new message/response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChatMessage {
    pub message: String,
    pub response: String,
    pub user_id: Uuid,
}
