//! Auth configuration and shared handler state.

use std::sync::Arc;

use super::captcha::CaptchaVerifier;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_LOCKOUT_THRESHOLD: i32 = 5;
const DEFAULT_LOCKOUT_SECONDS: i64 = 30 * 60;
const DEFAULT_CAPTCHA_MIN_SCORE: f32 = 0.5;
const DEFAULT_TOTP_ISSUER: &str = "portero";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    lockout_threshold: i32,
    lockout_seconds: i64,
    captcha_min_score: f32,
    totp_issuer: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            lockout_threshold: DEFAULT_LOCKOUT_THRESHOLD,
            lockout_seconds: DEFAULT_LOCKOUT_SECONDS,
            captcha_min_score: DEFAULT_CAPTCHA_MIN_SCORE,
            totp_issuer: DEFAULT_TOTP_ISSUER.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_lockout_threshold(mut self, threshold: i32) -> Self {
        self.lockout_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_lockout_seconds(mut self, seconds: i64) -> Self {
        self.lockout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_captcha_min_score(mut self, score: f32) -> Self {
        self.captcha_min_score = score;
        self
    }

    #[must_use]
    pub fn with_totp_issuer(mut self, issuer: String) -> Self {
        self.totp_issuer = issuer;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(crate) fn lockout_threshold(&self) -> i32 {
        self.lockout_threshold
    }

    pub(crate) fn lockout_seconds(&self) -> i64 {
        self.lockout_seconds
    }

    pub(crate) fn captcha_min_score(&self) -> f32 {
        self.captcha_min_score
    }

    pub(crate) fn totp_issuer(&self) -> &str {
        &self.totp_issuer
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AuthState {
    config: AuthConfig,
    captcha: Arc<dyn CaptchaVerifier>,
}

impl AuthState {
    pub fn new(config: AuthConfig, captcha: Arc<dyn CaptchaVerifier>) -> Self {
        Self { config, captcha }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(crate) fn captcha(&self) -> &dyn CaptchaVerifier {
        self.captcha.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::captcha::{CaptchaVerifier, StaticCaptchaVerifier};
    use super::{AuthConfig, AuthState};
    use std::sync::Arc;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();

        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert_eq!(config.lockout_threshold(), super::DEFAULT_LOCKOUT_THRESHOLD);
        assert_eq!(config.lockout_seconds(), super::DEFAULT_LOCKOUT_SECONDS);
        assert_eq!(config.totp_issuer(), super::DEFAULT_TOTP_ISSUER);

        let config = config
            .with_session_ttl_seconds(60)
            .with_lockout_threshold(3)
            .with_lockout_seconds(120)
            .with_captcha_min_score(0.7)
            .with_totp_issuer("backoffice".to_string());

        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.lockout_threshold(), 3);
        assert_eq!(config.lockout_seconds(), 120);
        assert!((config.captcha_min_score() - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.totp_issuer(), "backoffice");
    }

    #[test]
    fn auth_state_exposes_captcha_verifier() {
        let captcha: Arc<dyn CaptchaVerifier> = Arc::new(StaticCaptchaVerifier::new(0.9));
        let state = AuthState::new(AuthConfig::new(), captcha);
        assert!((state.config().captcha_min_score() - 0.5).abs() < f32::EPSILON);
    }
}
