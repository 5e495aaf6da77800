//! Per-call time budgets.

use claimcheck_core::{ProviderError, ProviderResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Run one provider call under `timeout`.
///
/// Returns the response together with the time the call took. An elapsed
/// budget becomes [`ProviderError::Timeout`] for `provider_id`.
pub async fn call_with_timeout<F, T>(
    provider_id: &str,
    timeout: Duration,
    call: F,
) -> ProviderResult<(T, Duration)>
where
    F: Future<Output = ProviderResult<T>>,
{
    let start = Instant::now();
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Ok((value, start.elapsed())),
        Ok(Err(error)) => Err(error),
        Err(_) => Err(ProviderError::timeout(provider_id, timeout)),
    }
}
