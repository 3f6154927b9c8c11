//! Request/response types for the auth endpoints.
//!
//! The public API uses camelCase field names; the serde renames below are the
//! wire contract.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub totp_code: Option<String>,
    #[serde(default)]
    pub recaptcha_token: Option<String>,
}

/// Public projection of an account; never carries the password hash or the
/// TOTP secret.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
    pub two_factor_enabled: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub session_token: String,
    pub user: UserSummary,
}

/// 200-level "needs more info" reply when a 2FA-enabled account logs in
/// without a code.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TwoFactorPrompt {
    #[serde(rename = "requires2FA")]
    pub requires_2fa: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub success: bool,
    pub user: UserSummary,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateAdminRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct AdminSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateAdminResponse {
    pub success: bool,
    pub admin: AdminSummary,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetupResponse {
    pub success: bool,
    pub secret: String,
    /// otpauth:// provisioning URI for QR rendering on the client.
    pub qr_code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorVerifyRequest {
    pub totp_code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct OkResponse {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn login_request_accepts_optional_fields() -> Result<()> {
        let request: LoginRequest =
            serde_json::from_str(r#"{"username":"root","password":"hunter22"}"#)?;
        assert_eq!(request.username, "root");
        assert!(request.totp_code.is_none());
        assert!(request.recaptcha_token.is_none());

        let request: LoginRequest = serde_json::from_str(
            r#"{"username":"root","password":"hunter22","totpCode":"123456","recaptchaToken":"tok"}"#,
        )?;
        assert_eq!(request.totp_code.as_deref(), Some("123456"));
        assert_eq!(request.recaptcha_token.as_deref(), Some("tok"));
        Ok(())
    }

    #[test]
    fn login_response_uses_camel_case() -> Result<()> {
        let response = LoginResponse {
            success: true,
            session_token: "token".to_string(),
            user: UserSummary {
                id: "id".to_string(),
                username: "root".to_string(),
                email: "root@example.com".to_string(),
                two_factor_enabled: false,
            },
        };
        let value = serde_json::to_value(&response)?;
        assert!(value.get("sessionToken").is_some());
        let user = value.get("user").context("missing user")?;
        assert!(user.get("twoFactorEnabled").is_some());
        Ok(())
    }

    #[test]
    fn two_factor_prompt_field_name() -> Result<()> {
        let value = serde_json::to_value(TwoFactorPrompt { requires_2fa: true })?;
        assert_eq!(value.get("requires2FA"), Some(&serde_json::json!(true)));
        Ok(())
    }

    #[test]
    fn setup_response_uses_qr_code_field() -> Result<()> {
        let value = serde_json::to_value(TwoFactorSetupResponse {
            success: true,
            secret: "BASE32".to_string(),
            qr_code: "otpauth://totp/x".to_string(),
        })?;
        assert!(value.get("qrCode").is_some());
        Ok(())
    }
}
