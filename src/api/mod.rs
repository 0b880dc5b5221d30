//! API layer - HTTP handlers and routing
//!
//! This module contains every route the server answers:
//! - Marketing pages (`/`, `/ayurveda`)
//! - Sign-in view (`/signin`, `/signout`)
//! - Chat page and messages API (`/chatbot`, `/api/v1/messages`)
//! - Hospital finder page and places API (`/hospital-finder`, `/api/v1/places/nearby`)
//! - Embedded static assets (`/static/*`)
//!
//! The route guard wraps the whole router.

pub mod auth;
pub mod chat;
pub mod cookie;
pub mod finder;
pub mod middleware;
pub mod pages;
pub mod responses;
pub mod static_files;


use axum::{middleware as axum_middleware, routing::get, Router};

pub use middleware::{
    decide, ApiError, AppState, GuardDecision, RequireSession, SessionContext, CHAT_PATH,
    PROTECTED_PATHS, SIGN_IN_PATH,
};

/// Build the JSON API router
pub fn build_api_router() -> Router<AppState> {
    Router::new()
        .merge(chat::api_router())
        .merge(finder::api_router())
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(pages::router())
        .merge(auth::router())
        .merge(chat::page_router())
        .merge(finder::page_router())
        .nest("/api/v1", build_api_router())
        .route("/static/{*path}", get(static_files::serve_asset))
        .fallback(pages::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::route_guard,
        ))
        .with_state(state)
}
