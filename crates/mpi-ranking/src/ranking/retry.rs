use std::thread;
use std::time::Duration;

use tracing::warn;

use super::policy::RetryPolicy;
use super::store::StoreError;

/// Run a store operation, retrying transient failures with exponential backoff.
///
/// Runs on the blocking pool, so sleeping the thread between attempts is fine.
pub(crate) fn with_retry<T, F>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Result<T, StoreError>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = Duration::from_millis(policy.initial_backoff_ms);
    let mut attempt = 1;

    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %err,
                    "transient store error, retrying"
                );
                if !backoff.is_zero() {
                    thread::sleep(backoff);
                }
                backoff = backoff.saturating_mul(2);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
