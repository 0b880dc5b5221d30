//! Session store backed by the local SQLite database
//!
//! Accounts are confirmed immediately on sign-up. Tokens are random and
//! opaque; a refresh keeps both tokens and moves the expiry forward, so
//! concurrent requests carrying the same cookie never race each other.

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{normalize_email, Session, SessionTokens, User};
use crate::services::password::{hash_password, verify_password};
use crate::stores::{AuthError, SessionStore, SignUpOutcome};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Shortest password accepted at sign-up
pub const MIN_PASSWORD_LENGTH: usize = 6;

const INVALID_CREDENTIALS: &str = "Invalid login credentials";

pub struct LocalSessionStore {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    lifetime: Duration,
}

impl LocalSessionStore {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        lifetime_seconds: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            lifetime: Duration::seconds(lifetime_seconds),
        }
    }

    async fn open_session(&self, user: &User) -> Result<Session, AuthError> {
        self.prune_expired().await;

        let session = Session {
            user: user.identity(),
            access_token: Uuid::new_v4().simple().to_string(),
            refresh_token: Uuid::new_v4().simple().to_string(),
            expires_at: Utc::now() + self.lifetime,
        };

        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::debug!(user_id = %user.id, "Opened local session");
        Ok(session)
    }

    /// Best effort; a failure only costs a few stale rows
    async fn prune_expired(&self) {
        match self.session_repo.delete_expired().await {
            Ok(0) => {}
            Ok(deleted) => tracing::debug!(deleted, "Pruned expired sessions"),
            Err(e) => tracing::warn!("Failed to prune expired sessions: {:#}", e),
        }
    }
}

#[async_trait]
impl SessionStore for LocalSessionStore {
    async fn get_session(&self, tokens: &SessionTokens) -> Result<Option<Session>, AuthError> {
        let session = match self
            .session_repo
            .get_by_access_token(&tokens.access_token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.refresh_token != tokens.refresh_token {
            return Ok(None);
        }

        if session.is_expired() {
            // Expired rows are useless; drop them on sight
            if let Err(e) = self.session_repo.delete(&session.access_token).await {
                tracing::warn!(user_id = %session.user.id, "Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        Ok(Some(session))
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session, AuthError> {
        let expires_at = Utc::now() + self.lifetime;

        let extended = self
            .session_repo
            .extend(&session.access_token, &session.refresh_token, expires_at)
            .await
            .context("Failed to refresh session")?;

        if !extended {
            return Err(AuthError::SessionExpired);
        }

        Ok(Session {
            expires_at,
            ..session.clone()
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let user = self
            .user_repo
            .get_by_email(&normalize_email(email))
            .await
            .context("Failed to look up user")?
            .ok_or_else(|| AuthError::InvalidCredentials(INVALID_CREDENTIALS.to_string()))?;

        let valid = verify_password(password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(AuthError::InvalidCredentials(INVALID_CREDENTIALS.to_string()));
        }

        self.open_session(&user).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _redirect_to: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(AuthError::Rejected(
                "Unable to validate email address: invalid format".to_string(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Rejected(format!(
                "Password should be at least {} characters.",
                MIN_PASSWORD_LENGTH
            )));
        }

        if self
            .user_repo
            .exists_by_email(&email)
            .await
            .context("Failed to check email")?
        {
            return Err(AuthError::Rejected("User already registered".to_string()));
        }

        let password_hash = hash_password(password)?;
        let user = User::new(email, password_hash);
        self.user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = %user.id, "Registered local account");
        Ok(SignUpOutcome::SignedIn(self.open_session(&user).await?))
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        self.session_repo
            .delete(&session.access_token)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }
}
