//! Marketing pages
//!
//! - GET / - landing page
//! - GET /ayurveda - product introduction with the suggested questions
//!
//! Neither page holds server state; the session context only decides what
//! the nav shows.

use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::Response,
    routing::get,
    Router,
};
use tera::Context as TeraContext;

use crate::api::middleware::{AppState, SessionContext};
use crate::api::responses::{error_page, render_page};
use crate::models::SUGGESTED_QUESTIONS;
use crate::templates::StandardVars;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/ayurveda", get(ayurveda))
}

/// GET /
async fn home(State(state): State<AppState>, context: SessionContext) -> Response {
    let vars = StandardVars::new("/", context.session());
    render_page(&state, "home.html", &TeraContext::new(), &vars)
}

/// GET /ayurveda
async fn ayurveda(State(state): State<AppState>, context: SessionContext) -> Response {
    let mut page = TeraContext::new();
    page.insert("suggestions", &SUGGESTED_QUESTIONS);

    let vars = StandardVars::new("/ayurveda", context.session());
    render_page(&state, "ayurveda.html", &page, &vars)
}

/// Fallback for unknown paths
pub async fn not_found(
    State(state): State<AppState>,
    context: SessionContext,
    uri: Uri,
) -> Response {
    tracing::debug!(path = %uri.path(), "No route");
    let vars = StandardVars::new(uri.path(), context.session());
    error_page(&state, StatusCode::NOT_FOUND, "Page not found.", &vars)
}
