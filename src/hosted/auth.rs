//! Hosted auth client
//!
//! Talks to the auth REST API of the hosted backend:
//!
//! | operation         | request                                        |
//! |-------------------|------------------------------------------------|
//! | sign in           | `POST /token?grant_type=password`              |
//! | sign up           | `POST /signup?redirect_to=<url>`               |
//! | current user      | `GET /user` (bearer)                           |
//! | refresh           | `POST /token?grant_type=refresh_token`         |
//! | sign out          | `POST /logout` (bearer)                        |

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{read_failure, trim_base};
use crate::models::{Session, SessionTokens, UserIdentity};
use crate::stores::{AuthError, SessionStore, SignUpOutcome};

/// Lifetime assumed when neither the response nor the token states one
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

pub struct HostedSessionStore {
    client: reqwest::Client,
    auth_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct RemoteUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl RemoteUser {
    fn into_identity(self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            email: self.email.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: RemoteUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)))
            .unwrap_or_else(|| token_expiry(&self.access_token));

        Session {
            user: self.user.into_identity(),
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        }
    }
}

/// Expiry from the access token's `exp` claim, or the default lifetime
fn token_expiry(access_token: &str) -> DateTime<Utc> {
    jwt_expiry(access_token)
        .unwrap_or_else(|| Utc::now() + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS))
}

/// Read `exp` from a JWT payload. The signature is not checked; the store
/// verifies tokens on every request.
pub(crate) fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = BASE64URL_NOPAD
        .decode(payload.trim_end_matches('=').as_bytes())
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    DateTime::from_timestamp(claims.get("exp")?.as_i64()?, 0)
}

fn unavailable(e: reqwest::Error) -> AuthError {
    AuthError::Unavailable(e.to_string())
}

impl HostedSessionStore {
    pub fn new(client: reqwest::Client, store_url: &str, anon_key: impl Into<String>) -> Self {
        Self {
            client,
            auth_url: format!("{}/auth/v1", trim_base(store_url)),
            anon_key: anon_key.into(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{}", self.auth_url, path))
            .header("apikey", &self.anon_key)
    }

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, AuthError> {
        self.post("/token")
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await
            .map_err(unavailable)
    }

    async fn parse_session(response: reqwest::Response) -> Result<Session, AuthError> {
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("Malformed token response: {}", e)))?;
        Ok(token.into_session())
    }

    async fn refresh_tokens(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let response = self
            .token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await?;

        if response.status().is_success() {
            return Self::parse_session(response).await;
        }

        let (status, message) = read_failure(response).await;
        if status >= 500 {
            return Err(AuthError::Unavailable(message));
        }
        tracing::debug!(status, "Refresh token rejected: {}", message);
        Err(AuthError::SessionExpired)
    }
}

#[async_trait]
impl SessionStore for HostedSessionStore {
    async fn get_session(&self, tokens: &SessionTokens) -> Result<Option<Session>, AuthError> {
        let response = self
            .client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => {
                let user: RemoteUser = response
                    .json()
                    .await
                    .map_err(|e| AuthError::Unavailable(format!("Malformed user response: {}", e)))?;
                Ok(Some(Session {
                    user: user.into_identity(),
                    access_token: tokens.access_token.clone(),
                    refresh_token: tokens.refresh_token.clone(),
                    expires_at: token_expiry(&tokens.access_token),
                }))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                if tokens.refresh_token.is_empty() {
                    return Ok(None);
                }
                // Access token expired or revoked: one refresh attempt
                match self.refresh_tokens(&tokens.refresh_token).await {
                    Ok(session) => Ok(Some(session)),
                    Err(AuthError::Unavailable(reason)) => Err(AuthError::Unavailable(reason)),
                    Err(_) => Ok(None),
                }
            }
            _ => {
                let (status, message) = read_failure(response).await;
                Err(AuthError::Unavailable(format!("{} ({})", message, status)))
            }
        }
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session, AuthError> {
        self.refresh_tokens(&session.refresh_token).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let response = self
            .token_grant("password", json!({ "email": email, "password": password }))
            .await?;

        if response.status().is_success() {
            return Self::parse_session(response).await;
        }

        let (status, message) = read_failure(response).await;
        match status {
            400 | 401 => Err(AuthError::InvalidCredentials(message)),
            s if s >= 500 => Err(AuthError::Unavailable(message)),
            _ => Err(AuthError::Rejected(message)),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .post("/signup")
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(unavailable)?;

        if !response.status().is_success() {
            let (status, message) = read_failure(response).await;
            return Err(if status >= 500 {
                AuthError::Unavailable(message)
            } else {
                AuthError::Rejected(message)
            });
        }

        // Auto-confirmed projects answer with a token response, otherwise
        // with the bare user awaiting email confirmation.
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AuthError::Unavailable(format!("Malformed signup response: {}", e)))?;

        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)
                .map_err(|e| AuthError::Unavailable(format!("Malformed token response: {}", e)))?;
            Ok(SignUpOutcome::SignedIn(token.into_session()))
        } else {
            Ok(SignUpOutcome::PendingConfirmation)
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let response = self
            .post("/logout")
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(unavailable)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Token already gone; nothing left to revoke
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            _ => {
                let (_, message) = read_failure(response).await;
                Err(AuthError::Unavailable(message))
            }
        }
    }
}
