//! Database helpers for accounts and sessions.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::tokens::{generate_session_token, hash_session_token};

/// Full account row needed by the login flow. Internal only; the wire types
/// expose a projection without the hash or the secret.
pub(crate) struct AccountRecord {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) locked_until: Option<DateTime<Utc>>,
    pub(crate) two_factor_enabled: bool,
    pub(crate) two_factor_secret: Option<String>,
}

/// Account projection attached to a valid session.
pub(crate) struct SessionAccount {
    pub(crate) id: Uuid,
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) two_factor_enabled: bool,
}

/// Outcome when provisioning a new admin account.
#[derive(Debug)]
pub(crate) enum ProvisionOutcome {
    Created { id: Uuid },
    Conflict,
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

/// Fetch an active account by username. Deactivated accounts are invisible
/// to the login flow.
pub(crate) async fn lookup_account(pool: &PgPool, username: &str) -> Result<Option<AccountRecord>> {
    let query = r"
        SELECT id, username, email, password_hash, locked_until,
               two_factor_enabled, two_factor_secret
        FROM admin_accounts
        WHERE username = $1
          AND is_active
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT"
    );
    let row = sqlx::query(query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup account")?;

    Ok(row.map(|row| AccountRecord {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        locked_until: row.get("locked_until"),
        two_factor_enabled: row.get("two_factor_enabled"),
        two_factor_secret: row.get("two_factor_secret"),
    }))
}

/// Record one password failure and return the new consecutive-failure count.
///
/// The increment and the lockout trigger are a single statement, so
/// concurrent failures cannot under-count and slip past the threshold.
pub(crate) async fn register_failure(
    pool: &PgPool,
    account_id: Uuid,
    lockout_threshold: i32,
    lockout_seconds: i64,
) -> Result<i32> {
    let query = r"
        UPDATE admin_accounts
        SET failed_login_attempts = failed_login_attempts + 1,
            locked_until = CASE
                WHEN failed_login_attempts + 1 >= $2
                THEN NOW() + ($3 * INTERVAL '1 second')
                ELSE locked_until
            END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING failed_login_attempts
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE"
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .bind(lockout_threshold)
        .bind(lockout_seconds)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to register login failure")?;
    Ok(row.get("failed_login_attempts"))
}

/// Reset counters after a successful login and stamp `last_login`.
pub(crate) async fn clear_failures(pool: &PgPool, account_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE admin_accounts
        SET failed_login_attempts = 0,
            locked_until = NULL,
            last_login = NOW(),
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE"
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to clear login failures")?;
    Ok(())
}

/// Insert a new admin account with a hashed password.
///
/// Uniqueness on username and email is enforced by the database; a unique
/// violation maps to `Conflict` so races with a concurrent insert are safe.
pub(crate) async fn insert_account(
    pool: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<ProvisionOutcome> {
    let query = r"
        INSERT INTO admin_accounts (username, email, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT"
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(ProvisionOutcome::Created { id: row.get("id") }),
        Err(err) if is_unique_violation(&err) => Ok(ProvisionOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert account"),
    }
}

/// Pre-check used by provisioning to reject duplicates before hashing.
pub(crate) async fn account_exists(pool: &PgPool, username: &str, email: &str) -> Result<bool> {
    let query = "SELECT 1 FROM admin_accounts WHERE username = $1 OR email = $2 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT"
    );
    let row = sqlx::query(query)
        .bind(username)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check account existence")?;
    Ok(row.is_some())
}

/// Create a session row and return the raw token.
///
/// Only the token hash is stored. The retry loop covers the practically
/// impossible collision on the hash's unique index.
pub(crate) async fn insert_session(
    pool: &PgPool,
    account_id: Uuid,
    ip: Option<&str>,
    user_agent: Option<&str>,
    ttl_seconds: i64,
) -> Result<String> {
    let query = r"
        INSERT INTO admin_sessions (account_id, token_hash, ip_address, user_agent, expires_at)
        VALUES ($1, $2, $3::inet, $4, NOW() + ($5 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT"
    );

    for _ in 0..3 {
        let token = generate_session_token()?;
        let token_hash = hash_session_token(&token);
        let result = sqlx::query(query)
            .bind(account_id)
            .bind(&token_hash)
            .bind(ip)
            .bind(user_agent)
            .bind(ttl_seconds)
            .execute(pool)
            .instrument(span.clone())
            .await;

        match result {
            Ok(_) => return Ok(token),
            Err(err) if is_unique_violation(&err) => {}
            Err(err) => return Err(err).context("failed to insert session"),
        }
    }

    Err(anyhow!("failed to generate unique session token"))
}

/// Resolve a token hash to its account, only while the session is unexpired.
///
/// The account's active flag is deliberately not re-checked here; a session
/// issued before deactivation stays valid until it expires.
pub(crate) async fn lookup_session(
    pool: &PgPool,
    token_hash: &[u8],
) -> Result<Option<SessionAccount>> {
    let query = r"
        SELECT admin_accounts.id, admin_accounts.username, admin_accounts.email,
               admin_accounts.two_factor_enabled
        FROM admin_sessions
        JOIN admin_accounts ON admin_accounts.id = admin_sessions.account_id
        WHERE admin_sessions.token_hash = $1
          AND admin_sessions.expires_at > NOW()
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT"
    );
    let row = sqlx::query(query)
        .bind(token_hash)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup session")?;

    Ok(row.map(|row| SessionAccount {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        two_factor_enabled: row.get("two_factor_enabled"),
    }))
}

/// Delete a session row. Logout is idempotent; zero rows deleted is fine.
pub(crate) async fn delete_session(pool: &PgPool, token_hash: &[u8]) -> Result<()> {
    let query = "DELETE FROM admin_sessions WHERE token_hash = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE"
    );
    sqlx::query(query)
        .bind(token_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete session")?;
    Ok(())
}

/// Store a freshly generated TOTP secret. Enrollment does not enable 2FA;
/// that happens only after the first successful verification.
pub(crate) async fn set_two_factor_secret(
    pool: &PgPool,
    account_id: Uuid,
    secret: &str,
) -> Result<()> {
    let query = r"
        UPDATE admin_accounts
        SET two_factor_secret = $2,
            two_factor_enabled = FALSE,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE"
    );
    sqlx::query(query)
        .bind(account_id)
        .bind(secret)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store two-factor secret")?;
    Ok(())
}

pub(crate) async fn two_factor_secret(pool: &PgPool, account_id: Uuid) -> Result<Option<String>> {
    let query = "SELECT two_factor_secret FROM admin_accounts WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT"
    );
    let row = sqlx::query(query)
        .bind(account_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to load two-factor secret")?;
    Ok(row.and_then(|row| row.get("two_factor_secret")))
}

pub(crate) async fn enable_two_factor(pool: &PgPool, account_id: Uuid) -> Result<()> {
    let query = r"
        UPDATE admin_accounts
        SET two_factor_enabled = TRUE,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE"
    );
    sqlx::query(query)
        .bind(account_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to enable two-factor")?;
    Ok(())
}

/// Reap expired session rows. Hygiene only; reads already filter on expiry.
pub(crate) async fn delete_expired_sessions(pool: &PgPool) -> Result<u64> {
    let query = "DELETE FROM admin_sessions WHERE expires_at <= NOW()";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE"
    );
    let result = sqlx::query(query)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete expired sessions")?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::{AccountRecord, ProvisionOutcome, SessionAccount};
    use uuid::Uuid;

    #[test]
    fn provision_outcome_debug_names() {
        let created = ProvisionOutcome::Created { id: Uuid::nil() };
        assert!(format!("{created:?}").starts_with("Created"));
        assert_eq!(format!("{:?}", ProvisionOutcome::Conflict), "Conflict");
    }

    #[test]
    fn account_record_holds_values() {
        let record = AccountRecord {
            id: Uuid::nil(),
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            password_hash: "$2b$12$hash".to_string(),
            locked_until: None,
            two_factor_enabled: false,
            two_factor_secret: None,
        };
        assert_eq!(record.id, Uuid::nil());
        assert!(record.locked_until.is_none());
        assert!(!record.two_factor_enabled);
    }

    #[test]
    fn session_account_holds_values() {
        let account = SessionAccount {
            id: Uuid::nil(),
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            two_factor_enabled: true,
        };
        assert_eq!(account.username, "root");
        assert!(account.two_factor_enabled);
    }
}
