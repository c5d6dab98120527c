//! Caller-owned reconnect loop around [`PushClient::run`].

use std::time::Instant;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use gpush_core::ReconnectPolicy;

use super::engine::PushClient;
use super::error::ClientError;

/// Keep `client` registered as `client_id`, re-running it with exponential
/// backoff after each failure.
///
/// Returns `Ok(())` once `shutdown` is set to `true`, or the last error when
/// the policy gives up. Dropping the sender without sending `true` does not
/// stop the loop.
pub async fn run_with_reconnect(
    client: &PushClient,
    client_id: &str,
    policy: &ReconnectPolicy,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ClientError> {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown.borrow() {
            info!("Push client shutting down");
            return Ok(());
        }

        let started = Instant::now();
        let err = tokio::select! {
            result = client.run(client_id) => match result {
                Ok(()) => ClientError::StreamClosed,
                Err(e) => e,
            },
            () = shutdown_requested(&mut shutdown) => {
                info!("Push client received shutdown signal");
                return Ok(());
            }
        };

        // A session that stayed up for a while starts a fresh backoff.
        if started.elapsed() >= policy.reset_after {
            attempt = 0;
        }

        if !policy.should_retry(attempt) {
            error!(error = %err, attempt, "Max reconnect attempts reached");
            return Err(err);
        }

        let delay = policy.delay_for_attempt(attempt);
        warn!(
            client_id = %client_id,
            error = %err,
            attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Reconnecting"
        );

        tokio::select! {
            () = sleep(delay) => {}
            () = shutdown_requested(&mut shutdown) => {
                info!("Push client shutting down during reconnect wait");
                return Ok(());
            }
        }

        attempt = attempt.saturating_add(1);
    }
}

/// Resolves once the shutdown flag reads `true`; never resolves if the
/// sender goes away first.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
