//! Session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserIdentity;

/// Session issued by the session store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Signed-in user
    pub user: UserIdentity,
    /// Bearer token presented to the stores
    pub access_token: String,
    /// Token exchanged for a fresh session
    pub refresh_token: String,
    /// Expiration timestamp of the access token
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Tokens kept in the browser cookie
    pub fn tokens(&self) -> SessionTokens {
        SessionTokens {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }
}

/// The only session data the browser holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}
