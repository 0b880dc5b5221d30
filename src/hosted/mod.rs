//! Clients for the hosted services
//!
//! - `auth`: the hosted auth REST API (`{store.url}/auth/v1`)
//! - `messages`: the hosted message table (`{store.url}/rest/v1/{table}`)
//! - `places`: the places nearby-search web service
//!
//! All clients share one `reqwest::Client`. Every store request carries the
//! public `apikey`; user-scoped requests also carry the user's bearer token
//! so the store applies its row-level policies for that user.

pub mod auth;
pub mod messages;
pub mod places;

pub use auth::HostedSessionStore;
pub use messages::HostedMessageStore;
pub use places::PlacesClient;

use anyhow::{Context, Result};
use std::time::Duration;

const USER_AGENT: &str = concat!("Ayunetra/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client. `timeout_seconds: None` means requests are
/// never cut short.
pub fn build_client(timeout_seconds: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
    if let Some(seconds) = timeout_seconds {
        builder = builder.timeout(Duration::from_secs(seconds));
    }
    builder.build().context("Failed to build HTTP client")
}

/// Pull a human-readable message out of a hosted error body.
///
/// The auth API uses `error_description` or `msg`, the table API uses
/// `message`, and some gateways only send `error`.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .filter(|message| !message.trim().is_empty())
        .map(str::to_string)
}

/// Status code and message of a failed response
pub(crate) async fn read_failure(response: reqwest::Response) -> (u16, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unexpected response")
            .to_string()
    });
    (status.as_u16(), message)
}

fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_keys() {
        assert_eq!(
            error_message(r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(
            error_message(r#"{"code":422,"msg":"User already registered"}"#),
            Some("User already registered".to_string())
        );
        assert_eq!(
            error_message(r#"{"message":"JWT expired","code":"PGRST301"}"#),
            Some("JWT expired".to_string())
        );
        assert_eq!(error_message(r#"{"error":"rate limited"}"#), Some("rate limited".to_string()));
    }

    #[test]
    fn test_error_message_unusable_bodies() {
        assert_eq!(error_message("<html>Bad Gateway</html>"), None);
        assert_eq!(error_message(r#"{"msg":"  "}"#), None);
        assert_eq!(error_message(r#"{"code":500}"#), None);
    }

    #[test]
    fn test_build_client() {
        assert!(build_client(None).is_ok());
        assert!(build_client(Some(5)).is_ok());
    }
}
