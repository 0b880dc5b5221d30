//! User model
//!
//! `UserIdentity` is the part of a user every view sees. `User` is the full
//! account row kept by the local store (the hosted store never hands out
//! password material).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of the signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Unique identifier (owner key of chat messages)
    pub id: Uuid,
    /// Email address
    pub email: String,
}

/// Account entity stored by the local backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Email address (unique, stored lowercase)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new account.
    ///
    /// The password should already be hashed, see `services::password::hash_password()`.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: normalize_email(&email.into()),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            email: self.email.clone(),
        }
    }
}

/// Emails are compared case-insensitively and without surrounding spaces.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
