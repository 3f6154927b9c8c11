pub mod health;
pub use self::health::health;

pub mod login;
pub use self::login::login;

pub mod session;
pub use self::session::{logout, verify_session};

pub mod provision;
pub use self::provision::create_admin;

pub mod two_factor;
pub use self::two_factor::{setup_two_factor, verify_two_factor};

// common functions for the handlers
use axum::http::{header::AUTHORIZATION, HeaderMap};
use sqlx::PgPool;
use std::net::SocketAddr;

use super::{
    error::AuthError,
    storage::{lookup_session, SessionAccount},
    tokens::hash_session_token,
};

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Extract a client IP for rate limiting: proxy headers first, then the
/// peer address when the service is exposed directly.
pub(crate) fn extract_client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(str::to_string);
    }
    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);
    if real_ip.is_some() {
        return real_ip;
    }
    remote.map(|addr| addr.ip().to_string())
}

pub(crate) fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolve the bearer token into a session-backed account.
///
/// Shared by every endpoint that requires authentication. A missing header
/// and an expired/unknown token are distinguishable per the error taxonomy.
pub(crate) async fn authenticate(
    headers: &HeaderMap,
    pool: &PgPool,
) -> Result<SessionAccount, AuthError> {
    let token = extract_bearer_token(headers).ok_or(AuthError::MissingToken)?;
    let token_hash = hash_session_token(&token);
    let account = lookup_session(pool, &token_hash).await?;
    account.ok_or(AuthError::SessionInvalid)
}
