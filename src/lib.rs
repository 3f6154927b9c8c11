//! # Portero (Admin Authentication Service)
//!
//! `portero` guards the back-office: it authenticates admin accounts and
//! hands out opaque bearer sessions.
//!
//! ## Login hardening
//!
//! - **IP rate limiting:** 5 attempts per IP within a 15 minute sliding
//!   window; a CAPTCHA is demanded from the 3rd attempt on.
//! - **Account lockout:** 5 consecutive password failures lock the account
//!   for 30 minutes, independent of the IP window.
//! - **Second factor:** accounts can enroll a TOTP credential; once verified,
//!   logins require a current code.
//!
//! ## Sessions
//!
//! Session tokens are 32 random bytes, returned once to the caller; the
//! database only ever stores a SHA-256 hash. Sessions expire after 24 hours
//! and expired rows are reaped by a background sweeper.
//!
//! Failed logins are recorded in an append-only attempt ledger before the
//! error response is produced, so rate-limit state stays consistent.

pub mod cli;
pub mod portero;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
