//! Background reaper for expired session rows.
//!
//! Expired sessions are already invisible to reads (`expires_at > NOW()`),
//! so this task only bounds table growth.

use sqlx::PgPool;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info};

use super::storage::delete_expired_sessions;

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Spawn a task that periodically deletes expired sessions.
pub(crate) fn spawn_session_sweeper(pool: PgPool) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match delete_expired_sessions(&pool).await {
                Ok(0) => debug!("session sweep: nothing to reap"),
                Ok(reaped) => info!("session sweep: reaped {reaped} expired sessions"),
                Err(err) => error!("session sweep failed: {err}"),
            }

            sleep(DEFAULT_SWEEP_INTERVAL).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_interval_matches_attempt_window() {
        assert_eq!(DEFAULT_SWEEP_INTERVAL, Duration::from_secs(900));
    }
}
