//! IP-based rate limiting for the login flow.
//!
//! Every login attempt is appended to `login_attempts`; decisions are a
//! sliding-window read over the last 15 minutes, keyed by caller IP.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::Instrument;

pub(crate) const ATTEMPT_WINDOW: Duration = Duration::from_secs(15 * 60);
pub(crate) const IP_ATTEMPT_LIMIT: i64 = 5;
pub(crate) const CAPTCHA_AFTER_ATTEMPTS: i64 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RateDecision {
    Allowed,
    CaptchaNeeded,
    Limited,
}

/// Classify the current attempt given the count of prior ledger rows in the
/// trailing window. The attempt being decided is not in the ledger yet, so
/// the thresholds compare against `prior_attempts + 1`: the 3rd attempt from
/// an IP (2 prior rows) already requires a CAPTCHA, and the 6th (5 prior
/// rows) is rejected outright.
pub(crate) fn decide(prior_attempts: i64) -> RateDecision {
    if prior_attempts >= IP_ATTEMPT_LIMIT {
        RateDecision::Limited
    } else if prior_attempts + 1 >= CAPTCHA_AFTER_ATTEMPTS {
        RateDecision::CaptchaNeeded
    } else {
        RateDecision::Allowed
    }
}

/// Count ledger rows for an IP inside the trailing window.
pub(crate) async fn count_ip_attempts(pool: &PgPool, ip: &str) -> Result<i64> {
    let query = "SELECT COUNT(*) FROM login_attempts WHERE ip_address = $1::inet AND created_at > NOW() - $2::interval";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT"
    );
    let row = sqlx::query(query)
        .bind(ip)
        .bind(format!("{} seconds", ATTEMPT_WINDOW.as_secs()))
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count login attempts")?;
    Ok(row.get(0))
}

/// Append one row to the attempt ledger. Rows are never mutated afterwards.
pub(crate) async fn log_attempt(
    pool: &PgPool,
    ip: Option<&str>,
    username: &str,
    successful: bool,
    blocked_by_captcha: bool,
) -> Result<()> {
    let query = r"
        INSERT INTO login_attempts (ip_address, username, successful, blocked_by_captcha)
        VALUES ($1::inet, $2, $3, $4)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT"
    );
    sqlx::query(query)
        .bind(ip)
        .bind(username)
        .bind(successful)
        .bind(blocked_by_captcha)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to log login attempt")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_fifteen_minutes() {
        assert_eq!(ATTEMPT_WINDOW, Duration::from_secs(900));
    }

    #[test]
    fn decide_allows_first_two_attempts() {
        assert_eq!(decide(0), RateDecision::Allowed);
        assert_eq!(decide(1), RateDecision::Allowed);
    }

    #[test]
    fn decide_demands_captcha_on_third_attempt() {
        // 2 prior rows means the current attempt is the 3rd.
        assert_eq!(decide(2), RateDecision::CaptchaNeeded);
        assert_eq!(decide(3), RateDecision::CaptchaNeeded);
        assert_eq!(decide(4), RateDecision::CaptchaNeeded);
    }

    #[test]
    fn decide_limits_at_five_attempts() {
        assert_eq!(decide(5), RateDecision::Limited);
        assert_eq!(decide(50), RateDecision::Limited);
    }
}
