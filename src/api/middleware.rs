//! API middleware
//!
//! Contains:
//! - `AppState`, the shared state handed to every handler
//! - `ApiError`, the JSON error body of the `/api/v1` routes
//! - The route guard, which resolves the session from the cookie, refreshes
//!   it, and decides whether the request is served or redirected
//! - Extractors for the session the guard attached to the request

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::cookie;
use crate::config::Config;
use crate::models::{Session, SessionTokens};
use crate::services::ResponseGenerator;
use crate::stores::{AuthError, MessageStore, PlacesLookup, SessionStore};
use crate::templates::TemplateEngine;

/// Paths that require a session. Matched exactly.
pub const PROTECTED_PATHS: &[&str] = &["/chatbot"];

/// Where requests without a session are sent
pub const SIGN_IN_PATH: &str = "/signin";

/// Where signed-in visitors of the sign-in page are sent
pub const CHAT_PATH: &str = "/chatbot";

/// Prefix of embedded assets; never guarded
pub const STATIC_PREFIX: &str = "/static/";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<dyn SessionStore>,
    pub messages: Arc<dyn MessageStore>,
    pub places: Arc<dyn PlacesLookup>,
    pub responder: Arc<dyn ResponseGenerator>,
    pub templates: Arc<TemplateEngine>,
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    /// Validation error naming the offending request field
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::with_details(
            "VALIDATION_ERROR",
            message,
            serde_json::json!({ "field": field }),
        )
    }

    /// An upstream store failed
    pub fn store_error(message: impl Into<String>) -> Self {
        Self::new("STORE_ERROR", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "STORE_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

// ============================================================================
// Route Guard
// ============================================================================

/// What the guard does with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToSignIn,
    RedirectToChat,
}

/// Decide from the path and whether a session exists.
///
/// Both path sets are closed and matched exactly; every other path is
/// allowed whatever the session state.
pub fn decide(path: &str, has_session: bool) -> GuardDecision {
    if PROTECTED_PATHS.contains(&path) && !has_session {
        GuardDecision::RedirectToSignIn
    } else if path == SIGN_IN_PATH && has_session {
        GuardDecision::RedirectToChat
    } else {
        GuardDecision::Allow
    }
}

/// The session the guard resolved for this request
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    session: Option<Session>,
}

impl SessionContext {
    pub fn new(session: Option<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn into_session(self) -> Option<Session> {
        self.session
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Extractor for API handlers that need a session; rejects with `401`
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .and_then(|context| context.session.clone())
            .map(RequireSession)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// What the response does with the session cookie
#[derive(Debug, Clone, PartialEq)]
enum CookieUpdate {
    Keep,
    Set(SessionTokens),
    Clear,
}

struct Resolution {
    session: Option<Session>,
    cookie: CookieUpdate,
}

impl Resolution {
    fn none(cookie: CookieUpdate) -> Self {
        Self {
            session: None,
            cookie,
        }
    }
}

/// Resolve the cookie's tokens into a session and refresh it.
async fn resolve_session(state: &AppState, tokens: Option<SessionTokens>) -> Resolution {
    let Some(tokens) = tokens else {
        return Resolution::none(CookieUpdate::Keep);
    };

    let session = match state.sessions.get_session(&tokens).await {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::debug!("Session cookie no longer resolves to a session");
            return Resolution::none(CookieUpdate::Clear);
        }
        Err(AuthError::Unavailable(reason)) => {
            // The tokens may still be good once the store is back
            tracing::warn!("Session store unavailable: {}", reason);
            return Resolution::none(CookieUpdate::Keep);
        }
        Err(e) => {
            tracing::warn!("Failed to resolve session: {}", e);
            return Resolution::none(CookieUpdate::Clear);
        }
    };

    // get_session may already have exchanged the tokens
    let mut cookie = if session.tokens() == tokens {
        CookieUpdate::Keep
    } else {
        CookieUpdate::Set(session.tokens())
    };

    // Tokens exchanged above are fresh; refreshing again would spend another
    // rotating refresh token on the same request
    if !state.config.session.refresh_on_request || cookie != CookieUpdate::Keep {
        return Resolution {
            session: Some(session),
            cookie,
        };
    }

    let session = match state.sessions.refresh_session(&session).await {
        Ok(refreshed) => {
            cookie = CookieUpdate::Set(refreshed.tokens());
            refreshed
        }
        Err(AuthError::SessionExpired) => {
            tracing::debug!(user_id = %session.user.id, "Session refresh declined; keeping current session");
            session
        }
        Err(e) => {
            tracing::warn!(user_id = %session.user.id, "Session refresh failed: {}", e);
            session
        }
    };

    Resolution {
        session: Some(session),
        cookie,
    }
}

/// Route guard middleware
///
/// Runs on every request except embedded assets. On allow, the resolved
/// session is attached as a [`SessionContext`] extension; redirects are
/// `303 See Other`.
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if path.starts_with(STATIC_PREFIX) {
        return next.run(request).await;
    }

    let cookie_name = &state.config.session.cookie_name;
    let tokens = cookie::read_tokens(request.headers(), cookie_name);
    let mut resolution = resolve_session(&state, tokens).await;

    // An undecodable cookie is cleared like a stale one
    if resolution.session.is_none()
        && resolution.cookie == CookieUpdate::Keep
        && cookie::has_cookie(request.headers(), cookie_name)
        && cookie::read_tokens(request.headers(), cookie_name).is_none()
    {
        resolution.cookie = CookieUpdate::Clear;
    }

    let decision = decide(&path, resolution.session.is_some());
    tracing::debug!(path = %path, ?decision, "Route guard");

    let mut response = match decision {
        GuardDecision::Allow => {
            request
                .extensions_mut()
                .insert(SessionContext::new(resolution.session));
            next.run(request).await
        }
        GuardDecision::RedirectToSignIn => Redirect::to(SIGN_IN_PATH).into_response(),
        GuardDecision::RedirectToChat => Redirect::to(CHAT_PATH).into_response(),
    };

    // Handlers that set or clear the cookie themselves win
    if response.headers().contains_key(axum::http::header::SET_COOKIE) {
        return response;
    }

    match resolution.cookie {
        CookieUpdate::Keep => {}
        CookieUpdate::Set(tokens) => cookie::append_set_cookie(
            response.headers_mut(),
            &cookie::session_cookie(&state.config.session, &tokens),
        ),
        CookieUpdate::Clear => cookie::append_set_cookie(
            response.headers_mut(),
            &cookie::clear_cookie(&state.config.session),
        ),
    }

    response
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_path_without_session_redirects() {
        assert_eq!(decide("/chatbot", false), GuardDecision::RedirectToSignIn);
        assert_eq!(decide("/chatbot", true), GuardDecision::Allow);
    }

    #[test]
    fn test_sign_in_with_session_redirects_to_chat() {
        assert_eq!(decide("/signin", true), GuardDecision::RedirectToChat);
        assert_eq!(decide("/signin", false), GuardDecision::Allow);
    }

    #[test]
    fn test_no_prefix_matching() {
        assert_eq!(decide("/chatbot/history", false), GuardDecision::Allow);
        assert_eq!(decide("/chatbot/", false), GuardDecision::Allow);
        assert_eq!(decide("/signin/help", true), GuardDecision::Allow);
    }

    #[test]
    fn test_api_error_status_mapping() {
        assert_eq!(ApiError::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::invalid_field("message", "x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::store_error("x").status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::internal_error("x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_field_details() {
        let error = ApiError::invalid_field("message", "Invalid");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.error.details, Some(serde_json::json!({"field": "message"})));
    }

    #[test]
    fn test_session_context_default_is_signed_out() {
        let context = SessionContext::default();
        assert!(context.session().is_none());
        assert!(context.into_session().is_none());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn unguarded_path() -> impl Strategy<Value = String> {
        "/[a-z0-9/_-]{0,24}".prop_filter("not a guarded path", |path| {
            path != SIGN_IN_PATH && !PROTECTED_PATHS.contains(&path.as_str())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_protected_path_never_allowed_without_session(index in 0..PROTECTED_PATHS.len()) {
            prop_assert_eq!(decide(PROTECTED_PATHS[index], false), GuardDecision::RedirectToSignIn);
        }

        #[test]
        fn prop_other_paths_always_allowed(path in unguarded_path(), has_session in any::<bool>()) {
            prop_assert_eq!(decide(&path, has_session), GuardDecision::Allow);
        }
    }
}
