//! Admin account provisioning.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::portero::{
    error::AuthError,
    storage::{self, ProvisionOutcome},
    types::{AdminSummary, CreateAdminRequest, CreateAdminResponse},
};

const MIN_PASSWORD_LENGTH: usize = 8;

pub(crate) fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub(crate) fn valid_username(username: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9_.-]{3,64}$").is_ok_and(|re| re.is_match(username))
}

#[utoipa::path(
    post,
    path = "/create-admin",
    request_body = CreateAdminRequest,
    responses(
        (status = 200, description = "Account created", body = CreateAdminResponse),
        (status = 400, description = "Invalid input, or username/email already taken"),
    ),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn create_admin(
    pool: Extension<PgPool>,
    payload: Option<Json<CreateAdminRequest>>,
) -> Result<Response, AuthError> {
    let Some(Json(request)) = payload else {
        return Err(AuthError::InvalidPayload("Missing payload"));
    };

    if !valid_username(&request.username) {
        return Err(AuthError::InvalidPayload("Invalid username"));
    }
    if !valid_email(&request.email) {
        return Err(AuthError::InvalidPayload("Invalid email"));
    }
    if request.password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::InvalidPayload("Password too short"));
    }

    // Cheap pre-check before paying for the hash; the unique indexes still
    // catch a concurrent insert.
    if storage::account_exists(&pool, &request.username, &request.email).await? {
        return Err(AuthError::AlreadyExists);
    }

    let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))?;

    match storage::insert_account(&pool, &request.username, &request.email, &password_hash).await? {
        ProvisionOutcome::Created { id } => {
            info!("admin account created: {}", request.username);
            let response = CreateAdminResponse {
                success: true,
                admin: AdminSummary {
                    id: id.to_string(),
                    username: request.username,
                    email: request.email,
                },
            };
            Ok((StatusCode::OK, Json(response)).into_response())
        }
        ProvisionOutcome::Conflict => Err(AuthError::AlreadyExists),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
    }

    #[test]
    fn valid_username_enforces_charset_and_length() {
        assert!(valid_username("admin"));
        assert!(valid_username("jane.doe_01"));
        assert!(!valid_username("ab"));
        assert!(!valid_username("has space"));
        assert!(!valid_username("tab\tchar"));
    }
}
