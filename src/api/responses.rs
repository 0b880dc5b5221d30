//! HTML page responses
//!
//! Every page handler renders through [`render_page`] so the layout always
//! receives the standard variables. A render failure logs the template error
//! and answers with the error page instead of a half-written document.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tera::Context as TeraContext;

use crate::api::middleware::AppState;
use crate::templates::{simple_error_page, StandardVars};

/// Render `template` as a `200` HTML response
pub fn render_page(
    state: &AppState,
    template: &str,
    context: &TeraContext,
    vars: &StandardVars,
) -> Response {
    render_page_with_status(state, StatusCode::OK, template, context, vars)
}

pub fn render_page_with_status(
    state: &AppState,
    status: StatusCode,
    template: &str,
    context: &TeraContext,
    vars: &StandardVars,
) -> Response {
    match state.templates.render_page(template, context, vars) {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("{}", e);
            error_page(state, StatusCode::INTERNAL_SERVER_ERROR, "The page could not be rendered.", vars)
        }
    }
}

/// Render the error page, falling back to a bare document
pub fn error_page(
    state: &AppState,
    status: StatusCode,
    message: &str,
    vars: &StandardVars,
) -> Response {
    let mut context = TeraContext::new();
    context.insert("status", &status.as_u16());
    context.insert("message", message);

    let html = state
        .templates
        .render_page("error.html", &context, vars)
        .unwrap_or_else(|e| {
            tracing::error!("Error page failed to render: {}", e);
            simple_error_page(message)
        });

    (status, Html(html)).into_response()
}
