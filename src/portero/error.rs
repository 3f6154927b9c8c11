//! Error taxonomy for the auth endpoints.
//!
//! Every branch reachable from attacker-controlled input maps to a user-safe
//! message; storage and network failures collapse into a single generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Too many login attempts, please try again later")]
    RateLimited,
    #[error("CAPTCHA verification required")]
    CaptchaRequired,
    #[error("CAPTCHA verification failed")]
    CaptchaInvalid,
    // Covers both unknown username and wrong password, to avoid enumeration.
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Account temporarily locked")]
    AccountLocked { locked_until: DateTime<Utc> },
    #[error("Invalid 2FA code")]
    TwoFactorInvalid,
    #[error("Missing authentication token")]
    MissingToken,
    #[error("Invalid or expired session")]
    SessionInvalid,
    #[error("An account with that username or email already exists")]
    AlreadyExists,
    #[error("{0}")]
    InvalidPayload(&'static str),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RateLimited | Self::CaptchaRequired => StatusCode::TOO_MANY_REQUESTS,
            Self::CaptchaInvalid
            | Self::TwoFactorInvalid
            | Self::AlreadyExists
            | Self::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials | Self::MissingToken | Self::SessionInvalid => {
                StatusCode::UNAUTHORIZED
            }
            Self::AccountLocked { .. } => StatusCode::LOCKED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            // Log the cause; the caller only ever sees the generic message.
            error!("internal error: {err:?}");
        }

        let mut body = json!({
            "success": false,
            "error": self.to_string(),
        });

        match &self {
            Self::RateLimited | Self::CaptchaRequired => {
                body["requiresCaptcha"] = json!(true);
            }
            Self::AccountLocked { locked_until } => {
                body["lockedUntil"] = json!(locked_until.to_rfc3339());
            }
            _ => {}
        }

        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::http::StatusCode;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            AuthError::RateLimited.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::CaptchaRequired.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AuthError::CaptchaInvalid.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::InvalidCredentials.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::AccountLocked {
                locked_until: Utc::now()
            }
            .status_code(),
            StatusCode::LOCKED
        );
        assert_eq!(
            AuthError::TwoFactorInvalid.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::MissingToken.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::SessionInvalid.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::AlreadyExists.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AuthError::Internal(anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_error_hides_cause() {
        let err = AuthError::Internal(anyhow!("pool timed out"));
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn credentials_error_is_generic() {
        // Same message for unknown user and wrong password.
        assert_eq!(
            AuthError::InvalidCredentials.to_string(),
            "Invalid username or password"
        );
    }
}
