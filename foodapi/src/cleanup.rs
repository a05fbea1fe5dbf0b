//! Periodic sweep of expired session tokens.
//!
//! Expired tokens never validate, so this is housekeeping only: it keeps the `tokens` table from
//! growing without bound. It is enabled by setting `auth.tokens.cleanup_interval`.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::db::{errors::Result, handlers::Tokens};

/// Delete every expired token once.
#[tracing::instrument(skip(pool))]
pub async fn sweep_expired_tokens(pool: &PgPool, query_timeout: Duration) -> Result<u64> {
    let mut conn = pool.acquire().await?;
    Tokens::new(&mut conn).with_timeout(query_timeout).delete_expired().await
}

/// Sweep on every tick of `interval` until `shutdown` is cancelled. Failures are logged and the
/// next tick tries again.
pub async fn run_token_cleanup(pool: PgPool, interval: Duration, query_timeout: Duration, shutdown: CancellationToken) {
    tracing::info!("Starting token cleanup every {:?}", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::info!("Token cleanup stopped");
                return;
            }
            _ = ticker.tick() => {
                match sweep_expired_tokens(&pool, query_timeout).await {
                    Ok(0) => tracing::trace!("No expired tokens to remove"),
                    Ok(removed) => tracing::info!(removed, "Removed expired tokens"),
                    Err(e) => tracing::error!("Token cleanup failed: {}", e),
                }
            }
        }
    }
}
