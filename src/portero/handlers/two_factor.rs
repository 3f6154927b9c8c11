//! TOTP enrollment and verification endpoints.
//!
//! Enrollment stores a fresh secret but leaves 2FA disabled; only a
//! successful verification flips the flag. There is no disable transition.

use axum::{extract::Extension, http::HeaderMap, response::Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::portero::{
    error::AuthError,
    state::AuthState,
    storage, totp,
    types::{OkResponse, TwoFactorSetupResponse, TwoFactorVerifyRequest},
};

use super::authenticate;

#[utoipa::path(
    post,
    path = "/setup-2fa",
    responses(
        (status = 200, description = "Secret generated", body = TwoFactorSetupResponse),
        (status = 401, description = "Missing or invalid session"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn setup_two_factor(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> Result<Json<TwoFactorSetupResponse>, AuthError> {
    let account = authenticate(&headers, &pool).await?;

    let secret = totp::generate_secret()?;
    let uri = totp::provisioning_uri(
        &secret,
        auth_state.config().totp_issuer(),
        &account.username,
    )?;

    // Re-running setup replaces any previous unverified secret.
    storage::set_two_factor_secret(&pool, account.id, &secret).await?;

    Ok(Json(TwoFactorSetupResponse {
        success: true,
        secret,
        qr_code: uri,
    }))
}

#[utoipa::path(
    post,
    path = "/verify-2fa",
    request_body = TwoFactorVerifyRequest,
    responses(
        (status = 200, description = "Two-factor enabled", body = OkResponse),
        (status = 400, description = "Code rejected or enrollment not started"),
        (status = 401, description = "Missing or invalid session"),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn verify_two_factor(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<TwoFactorVerifyRequest>>,
) -> Result<Json<OkResponse>, AuthError> {
    let account = authenticate(&headers, &pool).await?;

    let Some(Json(request)) = payload else {
        return Err(AuthError::InvalidPayload("Missing payload"));
    };

    let Some(secret) = storage::two_factor_secret(&pool, account.id).await? else {
        return Err(AuthError::InvalidPayload("Two-factor enrollment not started"));
    };

    if !totp::verify_code(&secret, auth_state.config().totp_issuer(), &request.totp_code)? {
        return Err(AuthError::TwoFactorInvalid);
    }

    storage::enable_two_factor(&pool, account.id).await?;
    info!("two-factor enabled for {}", account.username);

    Ok(Json(OkResponse { success: true }))
}
