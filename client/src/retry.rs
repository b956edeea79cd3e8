use std::future::Future;

use tracing::warn;

use crate::config::RetryPolicy;
use crate::errors::{Operation, Result};

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts.
///
/// Only idempotent operations are ever repeated; for anything else `call`
/// runs exactly once.
pub async fn retry_idempotent<T, F, Fut>(policy: &RetryPolicy, operation: Operation, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !operation.is_idempotent() {
        return call().await;
    }

    let mut attempt = 1;
    loop {
        match call().await {
            Err(err) if err.is_retry_safe() && attempt < policy.max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(%operation, attempt, ?delay, error = %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
