//! Session cookie
//!
//! The browser only holds the session tokens. They travel as URL-encoded JSON
//! in a single cookie:
//!
//! ```text
//! sb-auth=%7B%22access_token%22%3A...%7D; Path=/; HttpOnly; SameSite=Lax; Max-Age=604800
//! ```

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::SessionConfig;
use crate::models::SessionTokens;

/// Read the session tokens from the request's `Cookie` headers.
///
/// A cookie that is present but cannot be decoded counts as absent.
pub fn read_tokens(headers: &HeaderMap, cookie_name: &str) -> Option<SessionTokens> {
    let prefix = format!("{}=", cookie_name);

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .and_then(decode_tokens)
}

/// Whether the request carries the session cookie at all
pub fn has_cookie(headers: &HeaderMap, cookie_name: &str) -> bool {
    let prefix = format!("{}=", cookie_name);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .any(|cookie| cookie.trim().starts_with(prefix.as_str()))
}

pub fn encode_tokens(tokens: &SessionTokens) -> String {
    let json = serde_json::to_string(tokens).unwrap_or_default();
    urlencoding::encode(&json).into_owned()
}

pub fn decode_tokens(value: &str) -> Option<SessionTokens> {
    let json = urlencoding::decode(value).ok()?;
    serde_json::from_str(&json).ok()
}

/// `Set-Cookie` value storing `tokens` for `lifetime_seconds`
pub fn session_cookie(config: &SessionConfig, tokens: &SessionTokens) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name,
        encode_tokens(tokens),
        config.lifetime_seconds
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the session cookie
pub fn clear_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.cookie_name
    );
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Append a `Set-Cookie` header
pub fn append_set_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(header::SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Invalid Set-Cookie value: {}", e),
    }
}
