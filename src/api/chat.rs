//! Chat page and messages API
//!
//! Handles:
//! - GET /chatbot - mount the chat view (`?suggestion=N` prefills the composer)
//! - POST /chatbot - send the composer text
//! - GET /api/v1/messages - history of the signed-in user, newest first
//! - POST /api/v1/messages - send a message
//!
//! Each request drives its own [`ChatView`]; the session comes from the
//! route guard.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tera::Context as TeraContext;

use crate::api::middleware::{
    ApiError, AppState, RequireSession, SessionContext, CHAT_PATH, SIGN_IN_PATH,
};
use crate::api::responses::render_page_with_status;
use crate::models::{ChatMessage, Session};
use crate::services::{ChatState, ChatView, SendOutcome};
use crate::templates::StandardVars;

/// Build the chat page router
pub fn page_router() -> Router<AppState> {
    Router::new().route(CHAT_PATH, get(chat_page).post(send_from_page))
}

/// Build the messages API router (nested under `/api/v1`)
pub fn api_router() -> Router<AppState> {
    Router::new().route("/messages", get(list_messages).post(create_message))
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatPageQuery {
    pub suggestion: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ComposerForm {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<ChatMessage>,
}

fn new_view(state: &AppState) -> ChatView {
    ChatView::new(state.messages.clone(), state.responder.clone())
}

/// GET /chatbot
async fn chat_page(
    State(state): State<AppState>,
    context: SessionContext,
    Query(query): Query<ChatPageQuery>,
) -> Response {
    let mut view = new_view(&state);
    if view.mount(context.into_session()).await == ChatState::UnauthenticatedRedirecting {
        return Redirect::to(SIGN_IN_PATH).into_response();
    }

    if let Some(index) = query.suggestion {
        if !view.select_suggestion(index) {
            tracing::debug!(index, "Ignoring unknown suggestion");
        }
    }

    render_chat(&state, &view, StatusCode::OK)
}

/// POST /chatbot
async fn send_from_page(
    State(state): State<AppState>,
    context: SessionContext,
    Form(form): Form<ComposerForm>,
) -> Response {
    let mut view = new_view(&state);
    if view.mount(context.into_session()).await == ChatState::UnauthenticatedRedirecting {
        return Redirect::to(SIGN_IN_PATH).into_response();
    }

    view.set_composer(form.message);
    match view.submit().await {
        SendOutcome::Sent(_) => Redirect::to(CHAT_PATH).into_response(),
        SendOutcome::Ignored => render_chat(&state, &view, StatusCode::OK),
        SendOutcome::Failed(_) => render_chat(&state, &view, StatusCode::BAD_GATEWAY),
    }
}

fn render_chat(state: &AppState, view: &ChatView, status: StatusCode) -> Response {
    let mut page = TeraContext::new();
    page.insert("history", view.history());
    page.insert("composer", view.composer());
    page.insert("suggestions", view.suggestions());

    let vars = StandardVars::new(CHAT_PATH, view.session()).with_notice(view.notice().cloned());
    render_page_with_status(state, status, "chatbot.html", &page, &vars)
}

/// GET /api/v1/messages
async fn list_messages(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state.messages.list_for_user(&session).await.map_err(|e| {
        tracing::error!(user_id = %session.user.id, "Failed to list messages: {}", e);
        ApiError::store_error(e.to_string())
    })?;

    Ok(Json(MessagesResponse { messages }))
}

/// POST /api/v1/messages
async fn create_message(
    State(state): State<AppState>,
    RequireSession(session): RequireSession,
    Json(body): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::invalid_field("message", "Message must not be empty"));
    }

    let mut view = mounted_for_send(&state, session).await;
    view.set_composer(body.message);

    match view.submit().await {
        SendOutcome::Sent(row) => Ok((StatusCode::CREATED, Json(row))),
        SendOutcome::Failed(reason) => Err(ApiError::store_error(reason)),
        SendOutcome::Ignored => Err(ApiError::internal_error("Message was not sent")),
    }
}

/// A view ready to send. The API does not surface the history, so a
/// failed history load does not block the send.
async fn mounted_for_send(state: &AppState, session: Session) -> ChatView {
    let mut view = new_view(state);
    view.mount(Some(session)).await;
    view
}
