//! External store boundaries
//!
//! The server reaches every piece of persistent state through one of three
//! contracts:
//! - `SessionStore`: issues, refreshes and destroys sessions
//! - `MessageStore`: the table of chat message/response pairs
//! - `PlacesLookup`: points of interest near a coordinate
//!
//! Hosted implementations live in [`crate::hosted`]; the local SQLite
//! implementations live in [`crate::services::local_auth`] and
//! [`crate::db::repositories`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{ChatMessage, Coordinate, NewChatMessage, PlaceResult, Session, SessionTokens};

// ============================================================================
// Session Store
// ============================================================================

/// Error types for session store operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Credentials were rejected
    #[error("{0}")]
    InvalidCredentials(String),

    /// The store refused the request (e.g. account already registered)
    #[error("{0}")]
    Rejected(String),

    /// The session can no longer be used or refreshed
    #[error("Session expired")]
    SessionExpired,

    /// The store could not be reached
    #[error("Auth service unavailable: {0}")]
    Unavailable(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Result of creating an account
#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    /// The account must be confirmed through the emailed link first
    PendingConfirmation,
    /// The store confirmed the account immediately and opened a session
    SignedIn(Session),
}

/// Issues, persists and refreshes sessions tied to a user identity
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve the session the browser tokens belong to, if still valid
    async fn get_session(&self, tokens: &SessionTokens) -> Result<Option<Session>, AuthError>;

    /// Exchange the session for a fresh one
    async fn refresh_session(&self, session: &Session) -> Result<Session, AuthError>;

    /// Open a session with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;

    /// Create an account; `redirect_to` is where the confirmation link lands
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, AuthError>;

    /// Destroy the session
    async fn sign_out(&self, session: &Session) -> Result<(), AuthError>;
}

// ============================================================================
// Message Store
// ============================================================================

/// Error types for message store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Message store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Message store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Table of chat records owned by users.
///
/// Both operations act on behalf of `session`; implementations scope reads
/// and writes to `session.user`.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// All messages of the session's user, newest first
    async fn list_for_user(&self, session: &Session) -> Result<Vec<ChatMessage>, StoreError>;

    /// Insert a row and return it with the store-assigned id and timestamp
    async fn insert(
        &self,
        session: &Session,
        message: NewChatMessage,
    ) -> Result<ChatMessage, StoreError>;
}

// ============================================================================
// Places Lookup
// ============================================================================

/// Status reported by the places service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacesStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    RequestDenied,
    InvalidRequest,
    NotFound,
    UnknownError,
}

impl PlacesStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::ZeroResults => "ZERO_RESULTS",
            Self::OverQueryLimit => "OVER_QUERY_LIMIT",
            Self::RequestDenied => "REQUEST_DENIED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::NotFound => "NOT_FOUND",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }

    /// Parse a wire status; unrecognised values map to `UnknownError`
    pub fn parse(status: &str) -> Self {
        match status {
            "OK" => Self::Ok,
            "ZERO_RESULTS" => Self::ZeroResults,
            "OVER_QUERY_LIMIT" => Self::OverQueryLimit,
            "REQUEST_DENIED" => Self::RequestDenied,
            "INVALID_REQUEST" => Self::InvalidRequest,
            "NOT_FOUND" => Self::NotFound,
            _ => Self::UnknownError,
        }
    }
}

impl fmt::Display for PlacesStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for places lookups
#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    /// The service answered with a non-OK status
    #[error("Places lookup returned status {0}")]
    Status(PlacesStatus),

    /// The service could not be reached or answered garbage
    #[error("Places lookup unavailable: {0}")]
    Unavailable(String),
}

/// Parameters of a nearby search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbySearch {
    pub location: Coordinate,
    pub radius_meters: u32,
    pub category: String,
}

/// Returns points of interest of a category near a coordinate
#[async_trait]
pub trait PlacesLookup: Send + Sync {
    async fn nearby_search(&self, request: &NearbySearch) -> Result<Vec<PlaceResult>, PlacesError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_places_status_parse() {
        assert_eq!(PlacesStatus::parse("OK"), PlacesStatus::Ok);
        assert_eq!(PlacesStatus::parse("ZERO_RESULTS"), PlacesStatus::ZeroResults);
        assert_eq!(PlacesStatus::parse("REQUEST_DENIED"), PlacesStatus::RequestDenied);
        assert_eq!(PlacesStatus::parse("SOMETHING_NEW"), PlacesStatus::UnknownError);
    }

    #[test]
    fn test_places_status_display_matches_wire() {
        for status in [
            PlacesStatus::Ok,
            PlacesStatus::ZeroResults,
            PlacesStatus::OverQueryLimit,
            PlacesStatus::InvalidRequest,
        ] {
            assert_eq!(PlacesStatus::parse(&status.to_string()), status);
        }
    }

    #[test]
    fn test_auth_error_message_is_store_message() {
        let err = AuthError::InvalidCredentials("Invalid login credentials".to_string());
        assert_eq!(err.to_string(), "Invalid login credentials");
    }
}
