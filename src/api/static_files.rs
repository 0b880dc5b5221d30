//! Embedded static assets
//!
//! `static/` is compiled into the binary and served under `/static/`. The
//! route guard never runs for these paths.

use axum::{
    extract::Path,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// GET /static/{*path}
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    let decoded = urlencoding::decode(&path).unwrap_or_else(|_| path.as_str().into());
    let asset_path = decoded.trim_start_matches('/');

    match StaticAssets::get(asset_path) {
        Some(content) => build_response(asset_path, content.data.into_owned()),
        None => not_found(),
    }
}

fn build_response(path: &str, data: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, get_content_type(path)),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        data,
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not Found",
    )
        .into_response()
}

fn get_content_type(path: &str) -> &'static str {
    match path.rsplit('.').next().unwrap_or("") {
        "html" => "text/html; charset=utf-8",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff2" => "font/woff2",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}
