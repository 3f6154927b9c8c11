//! Credential login: rate limiting, CAPTCHA escalation, lockout, TOTP gate,
//! session issuance.

use axum::{
    extract::{ConnectInfo, Extension},
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use sqlx::PgPool;
use std::{net::SocketAddr, sync::Arc};
use tracing::{debug, instrument, warn};

use crate::portero::{
    error::AuthError,
    rate_limit::{self, RateDecision},
    state::AuthState,
    storage, totp,
    types::{LoginRequest, LoginResponse, TwoFactorPrompt, UserSummary},
};

use super::{extract_client_ip, extract_user_agent};

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued, or a second factor is required", body = LoginResponse),
        (status = 400, description = "CAPTCHA or 2FA code rejected"),
        (status = 401, description = "Invalid credentials"),
        (status = 423, description = "Account temporarily locked"),
        (status = 429, description = "Too many attempts from this IP"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::InvalidPayload("Missing payload"));
    };

    let ip = extract_client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let user_agent = extract_user_agent(&headers);

    // 1. Rate check over the trailing window, keyed by caller IP. This
    // branch does not consume further attempts.
    let attempts = match ip.as_deref() {
        Some(ip) => rate_limit::count_ip_attempts(&pool, ip).await?,
        None => 0,
    };
    match rate_limit::decide(attempts) {
        RateDecision::Limited => {
            warn!("rate limited after {attempts} attempts in window");
            return Err(AuthError::RateLimited);
        }
        RateDecision::CaptchaNeeded => {
            // 2. CAPTCHA gate. A failed or missing verification is logged
            // as a blocked attempt before the error goes out.
            let Some(token) = request.recaptcha_token.as_deref() else {
                return Err(AuthError::CaptchaRequired);
            };
            let score = match auth_state.captcha().verify(token, ip.as_deref()).await {
                Ok(score) => score,
                Err(err) => {
                    // Provider trouble counts as a failed verification.
                    warn!("CAPTCHA verification errored: {err}");
                    0.0
                }
            };
            if score <= auth_state.config().captcha_min_score() {
                rate_limit::log_attempt(&pool, ip.as_deref(), &request.username, false, true)
                    .await?;
                return Err(AuthError::CaptchaInvalid);
            }
        }
        RateDecision::Allowed => {}
    }

    // 3. Account lookup. Unknown usernames get the same response as wrong
    // passwords, with a dummy hash comparison to equalize timing.
    let Some(account) = storage::lookup_account(&pool, &request.username).await? else {
        let _ = bcrypt::verify(
            &request.password,
            "$2b$12$C6UzMDM.H6dfI/f/IKcEeO5sBNDQ7BZ4BmfuOpUMbqhXR8cMT7dW6",
        );
        rate_limit::log_attempt(&pool, ip.as_deref(), &request.username, false, false).await?;
        return Err(AuthError::InvalidCredentials);
    };

    // 4. Lockout check. The lock itself is the throttle, so this branch
    // intentionally writes no attempt record.
    if let Some(locked_until) = account.locked_until {
        if locked_until > chrono::Utc::now() {
            return Err(AuthError::AccountLocked { locked_until });
        }
    }

    // 5. Password check with an atomic failure counter.
    if !bcrypt::verify(&request.password, &account.password_hash).unwrap_or(false) {
        rate_limit::log_attempt(&pool, ip.as_deref(), &request.username, false, false).await?;
        let failures = storage::register_failure(
            &pool,
            account.id,
            auth_state.config().lockout_threshold(),
            auth_state.config().lockout_seconds(),
        )
        .await?;
        debug!("password mismatch, consecutive failures: {failures}");
        return Err(AuthError::InvalidCredentials);
    }

    // 6. Second factor.
    if account.two_factor_enabled {
        let Some(code) = request.totp_code.as_deref() else {
            // Not an error: the client is expected to re-submit with a code.
            return Ok(Json(TwoFactorPrompt { requires_2fa: true }).into_response());
        };
        let secret = account
            .two_factor_secret
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("2FA enabled without a stored secret"))?;
        if !totp::verify_code(secret, auth_state.config().totp_issuer(), code)? {
            rate_limit::log_attempt(&pool, ip.as_deref(), &request.username, false, false).await?;
            return Err(AuthError::TwoFactorInvalid);
        }
    }

    // 7. Session issuance.
    let session_token = storage::insert_session(
        &pool,
        account.id,
        ip.as_deref(),
        user_agent.as_deref(),
        auth_state.config().session_ttl_seconds(),
    )
    .await?;
    storage::clear_failures(&pool, account.id).await?;
    rate_limit::log_attempt(&pool, ip.as_deref(), &request.username, true, false).await?;

    let response = LoginResponse {
        success: true,
        session_token,
        user: UserSummary {
            id: account.id.to_string(),
            username: account.username,
            email: account.email,
            two_factor_enabled: account.two_factor_enabled,
        },
    };
    Ok(Json(response).into_response())
}
