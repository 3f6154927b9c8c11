//! CAPTCHA verification capability.
//!
//! The login flow only needs `verify(token) -> score`; the provider
//! round-trip lives behind a trait so tests never hit the network.

use anyhow::{Context, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{future::Future, pin::Pin};
use tracing::debug;
use url::Url;

use crate::APP_USER_AGENT;

pub trait CaptchaVerifier: Send + Sync {
    /// Verify a client token and return the provider's score in `[0, 1]`.
    ///
    /// Provider rejections map to a score of `0.0`; transport failures
    /// surface as errors and are treated as failed verification upstream.
    fn verify<'a>(
        &'a self,
        token: &'a str,
        ip: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<f32>> + Send + 'a>>;
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    success: bool,
    score: Option<f32>,
}

/// reCAPTCHA-style verifier posting the shared secret and token as a form.
pub struct HttpCaptchaVerifier {
    client: Client,
    url: Url,
    secret: SecretString,
}

impl HttpCaptchaVerifier {
    /// # Errors
    /// Returns an error if the endpoint URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(url: &str, secret: SecretString) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("Invalid CAPTCHA endpoint: {url}"))?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .build()
            .context("failed to build CAPTCHA client")?;
        Ok(Self {
            client,
            url,
            secret,
        })
    }

    async fn verify_remote(&self, token: &str, ip: Option<&str>) -> Result<f32> {
        let mut form = vec![
            ("secret", self.secret.expose_secret().to_string()),
            ("response", token.to_string()),
        ];
        if let Some(ip) = ip {
            form.push(("remoteip", ip.to_string()));
        }

        let response = self
            .client
            .post(self.url.clone())
            .form(&form)
            .send()
            .await
            .context("CAPTCHA provider request failed")?;

        let body: ProviderResponse = response
            .json()
            .await
            .context("CAPTCHA provider returned an unreadable body")?;

        if !body.success {
            debug!("CAPTCHA provider rejected token");
            return Ok(0.0);
        }

        // Providers without score support (v2) report success only.
        Ok(body.score.unwrap_or(1.0))
    }
}

impl CaptchaVerifier for HttpCaptchaVerifier {
    fn verify<'a>(
        &'a self,
        token: &'a str,
        ip: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<f32>> + Send + 'a>> {
        Box::pin(self.verify_remote(token, ip))
    }
}

/// Fixed-score verifier for tests and local development.
#[derive(Clone, Copy, Debug)]
pub struct StaticCaptchaVerifier {
    score: f32,
}

impl StaticCaptchaVerifier {
    #[must_use]
    pub fn new(score: f32) -> Self {
        Self { score }
    }
}

impl CaptchaVerifier for StaticCaptchaVerifier {
    fn verify<'a>(
        &'a self,
        _token: &'a str,
        _ip: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<f32>> + Send + 'a>> {
        Box::pin(async move { Ok(self.score) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_verifier_returns_score() -> Result<()> {
        let verifier = StaticCaptchaVerifier::new(0.9);
        let score = verifier.verify("token", None).await?;
        assert!((score - 0.9).abs() < f32::EPSILON);
        Ok(())
    }

    #[test]
    fn http_verifier_rejects_bad_url() {
        let result = HttpCaptchaVerifier::new("not a url", SecretString::default());
        assert!(result.is_err());
    }

    #[test]
    fn provider_response_parses_score() -> Result<()> {
        let body: ProviderResponse = serde_json::from_str(r#"{"success":true,"score":0.7}"#)?;
        assert!(body.success);
        assert_eq!(body.score, Some(0.7));

        let body: ProviderResponse = serde_json::from_str(r#"{"success":false}"#)?;
        assert!(!body.success);
        assert!(body.score.is_none());
        Ok(())
    }
}
