//! Session verification and logout.

use axum::{extract::Extension, http::HeaderMap, response::Json};
use sqlx::PgPool;
use tracing::error;

use crate::portero::{
    error::AuthError,
    tokens::hash_session_token,
    types::{OkResponse, SessionResponse, UserSummary},
};

use super::{authenticate, extract_bearer_token};

#[utoipa::path(
    get,
    path = "/verify-session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 401, description = "Missing, expired or unknown token"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn verify_session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
) -> Result<Json<SessionResponse>, AuthError> {
    let account = authenticate(&headers, &pool).await?;

    Ok(Json(SessionResponse {
        success: true,
        user: UserSummary {
            id: account.id.to_string(),
            username: account.username,
            email: account.email,
            two_factor_enabled: account.two_factor_enabled,
        },
    }))
}

#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Session cleared (idempotent)", body = OkResponse),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(headers: HeaderMap, pool: Extension<PgPool>) -> Json<OkResponse> {
    // Logout never fails the caller, even for an unknown or absent token.
    if let Some(token) = extract_bearer_token(&headers) {
        let token_hash = hash_session_token(&token);
        if let Err(err) = crate::portero::storage::delete_session(&pool, &token_hash).await {
            error!("Failed to delete session: {err}");
        }
    }

    Json(OkResponse { success: true })
}
