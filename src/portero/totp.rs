//! TOTP enrollment and verification.
//!
//! Standard RFC 6238 parameters: SHA-1, 6 digits, 30 second step, skew of
//! one step. Secrets are stored base32-encoded on the account and only
//! returned once, at enrollment.

use anyhow::{anyhow, Result};
use totp_rs::{Algorithm, Secret, TOTP};

/// Generate a fresh shared secret, base32-encoded.
pub(crate) fn generate_secret() -> Result<String> {
    let secret = Secret::generate_secret();
    match secret.to_encoded() {
        Secret::Encoded(encoded) => Ok(encoded),
        Secret::Raw(_) => Err(anyhow!("secret encoding failed")),
    }
}

fn build_totp(secret_base32: &str, issuer: &str, account: &str) -> Result<TOTP> {
    let secret_bytes = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| anyhow!("invalid TOTP secret: {e:?}"))?;

    TOTP::new(
        Algorithm::SHA1,
        6,
        1,
        30,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| anyhow!("TOTP init error: {e}"))
}

/// Build the otpauth:// provisioning URI for authenticator apps.
pub(crate) fn provisioning_uri(secret_base32: &str, issuer: &str, account: &str) -> Result<String> {
    Ok(build_totp(secret_base32, issuer, account)?.get_url())
}

/// Check a code against the stored secret for the current time step.
pub(crate) fn verify_code(secret_base32: &str, issuer: &str, code: &str) -> Result<bool> {
    // Label does not affect code verification.
    let totp = build_totp(secret_base32, issuer, "account")?;
    Ok(totp.check_current(code).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_secret_is_base32() -> Result<()> {
        let secret = generate_secret()?;
        assert!(!secret.is_empty());
        assert!(secret
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
        Ok(())
    }

    #[test]
    fn provisioning_uri_contains_issuer_and_account() -> Result<()> {
        let secret = generate_secret()?;
        let uri = provisioning_uri(&secret, "portero", "root")?;
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("issuer=portero"));
        assert!(uri.contains("root"));
        Ok(())
    }

    #[test]
    fn current_code_verifies() -> Result<()> {
        let secret = generate_secret()?;
        let totp = build_totp(&secret, "portero", "root")?;
        let code = totp
            .generate_current()
            .map_err(|e| anyhow!("clock error: {e}"))?;
        assert!(verify_code(&secret, "portero", &code)?);
        Ok(())
    }

    #[test]
    fn wrong_code_fails() -> Result<()> {
        let secret = generate_secret()?;
        assert!(!verify_code(&secret, "portero", "000000")?);
        Ok(())
    }

    #[test]
    fn malformed_secret_is_an_error() {
        assert!(verify_code("not base32!", "portero", "123456").is_err());
    }
}
