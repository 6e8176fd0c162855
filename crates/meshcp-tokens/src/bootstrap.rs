//! Default signing key bootstrap.
//!
//! Every issuing instance creates the default signing key at startup. The
//! store may not be reachable yet, so transient failures are retried with
//! exponential backoff and jitter:
//! `min(initial_backoff * 2^attempt, max_backoff) + random(0..50% of delay)`.
//! Instances racing to create the key converge through the store's
//! create-if-absent semantics.

use std::time::Duration;

use rand::Rng;

use crate::TokenResult;
use crate::config::BootstrapConfig;
use crate::signing::SigningKeyManager;

/// Creates the default signing key unless it exists, retrying transient
/// store failures.
///
/// # Errors
///
/// Returns the first non-transient error, or the last transient one once
/// `max_retries` is exhausted.
pub async fn ensure_default_signing_key(
    manager: &dyn SigningKeyManager,
    config: &BootstrapConfig,
) -> TokenResult<()> {
    let mut attempt = 0;
    loop {
        match manager.create_default_signing_key().await {
            Ok(()) => {
                if attempt > 0 {
                    tracing::info!(
                        prefix = manager.prefix(),
                        scope = %manager.scope(),
                        attempt = attempt + 1,
                        "Default signing key ready after retry"
                    );
                }
                return Ok(());
            }
            Err(err) if err.is_retryable() && attempt < config.max_retries => {
                let delay = compute_backoff(config, attempt);
                tracing::warn!(
                    prefix = manager.prefix(),
                    scope = %manager.scope(),
                    attempt = attempt + 1,
                    max_attempts = config.max_retries + 1,
                    delay = ?delay,
                    error = %err,
                    "Could not create default signing key, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn compute_backoff(config: &BootstrapConfig, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    let capped = config.initial_backoff.saturating_mul(factor).min(config.max_backoff);

    let jitter_range = u64::try_from(capped.as_millis()).unwrap_or(u64::MAX) / 2;
    if jitter_range > 0 {
        let jitter = rand::thread_rng().gen_range(0..=jitter_range);
        capped.saturating_add(Duration::from_millis(jitter))
    } else {
        capped
    }
}
