//! Sign-in view
//!
//! Handles:
//! - GET /signin - the email/password form
//! - POST /signin - sign in or create an account (`intent` field)
//! - POST /signout - destroy the session and clear the cookie
//!
//! Errors are shown inline with the submitted email preserved.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::cookie;
use crate::api::middleware::{AppState, SessionContext, CHAT_PATH, SIGN_IN_PATH};
use crate::api::responses::render_page_with_status;
use crate::models::{Notice, Session};
use crate::stores::{AuthError, SignUpOutcome};
use crate::templates::StandardVars;

const MISSING_FIELDS: &str = "Email and password are required.";
const CHECK_EMAIL: &str = "Check your email for the confirmation link!";
const AUTH_UNAVAILABLE: &str = "Sign-in is unavailable right now. Please try again later.";

/// Build the sign-in router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signin", get(sign_in_page).post(submit))
        .route("/signout", post(sign_out))
}

/// Which button submitted the form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    #[default]
    SignIn,
    SignUp,
}

/// Form body of POST /signin
#[derive(Debug, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub intent: Intent,
}

/// GET /signin
async fn sign_in_page(State(state): State<AppState>) -> Response {
    render_form(&state, StatusCode::OK, "", None)
}

/// POST /signin
async fn submit(State(state): State<AppState>, Form(form): Form<SignInForm>) -> Response {
    let email = form.email.trim().to_string();

    if email.is_empty() || form.password.is_empty() {
        return render_form(
            &state,
            StatusCode::UNPROCESSABLE_ENTITY,
            &email,
            Some(Notice::error(MISSING_FIELDS)),
        );
    }

    match form.intent {
        Intent::SignIn => match state.sessions.sign_in(&email, &form.password).await {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "User signed in");
                signed_in(&state, &session)
            }
            Err(e) => auth_failed(&state, &email, e),
        },
        Intent::SignUp => {
            let redirect_to = format!(
                "{}{}",
                state.config.server.public_url.trim_end_matches('/'),
                CHAT_PATH
            );

            match state
                .sessions
                .sign_up(&email, &form.password, &redirect_to)
                .await
            {
                Ok(SignUpOutcome::PendingConfirmation) => {
                    tracing::info!("Sign-up pending email confirmation");
                    render_form(&state, StatusCode::OK, &email, Some(Notice::info(CHECK_EMAIL)))
                }
                Ok(SignUpOutcome::SignedIn(session)) => {
                    tracing::info!(user_id = %session.user.id, "User signed up");
                    signed_in(&state, &session)
                }
                Err(e) => auth_failed(&state, &email, e),
            }
        }
    }
}

/// POST /signout
async fn sign_out(State(state): State<AppState>, context: SessionContext) -> Response {
    if let Some(session) = context.session() {
        match state.sessions.sign_out(session).await {
            Ok(()) => tracing::info!(user_id = %session.user.id, "User signed out"),
            // The cookie is cleared regardless
            Err(e) => tracing::warn!(user_id = %session.user.id, "Sign-out failed: {}", e),
        }
    }

    let mut headers = HeaderMap::new();
    cookie::append_set_cookie(&mut headers, &cookie::clear_cookie(&state.config.session));
    (headers, Redirect::to(SIGN_IN_PATH)).into_response()
}

/// Set the session cookie and go to the chat page
fn signed_in(state: &AppState, session: &Session) -> Response {
    let mut headers = HeaderMap::new();
    cookie::append_set_cookie(
        &mut headers,
        &cookie::session_cookie(&state.config.session, &session.tokens()),
    );
    (headers, Redirect::to(CHAT_PATH)).into_response()
}

fn auth_failed(state: &AppState, email: &str, error: AuthError) -> Response {
    let (status, message) = match &error {
        AuthError::InvalidCredentials(message) | AuthError::Rejected(message) => {
            tracing::info!("Authentication rejected: {}", message);
            (StatusCode::UNAUTHORIZED, message.clone())
        }
        AuthError::Unavailable(_) | AuthError::Internal(_) | AuthError::SessionExpired => {
            tracing::error!("Authentication failed: {}", error);
            (StatusCode::BAD_GATEWAY, AUTH_UNAVAILABLE.to_string())
        }
    };

    render_form(state, status, email, Some(Notice::error(message)))
}

fn render_form(state: &AppState, status: StatusCode, email: &str, notice: Option<Notice>) -> Response {
    let mut context = TeraContext::new();
    context.insert("email", email);

    let vars = StandardVars::new(SIGN_IN_PATH, None).with_notice(notice);
    render_page_with_status(state, status, "signin.html", &context, &vars)
}
