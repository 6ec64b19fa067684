use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(400);

/// How many times a failed operation may be re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryLimit {
    /// Give up after this many retries (so at most `n + 1` attempts).
    Bounded(u32),
    /// Never give up. Only for background work nobody is waiting on.
    Unbounded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub limit: RetryLimit,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn bounded(max_retries: u32, delay: Duration) -> Self {
        Self {
            limit: RetryLimit::Bounded(max_retries),
            delay,
        }
    }

    pub fn forever(delay: Duration) -> Self {
        Self {
            limit: RetryLimit::Unbounded,
            delay,
        }
    }

    fn allows(&self, retries_so_far: u32) -> bool {
        match self.limit {
            RetryLimit::Bounded(max) => retries_so_far < max,
            RetryLimit::Unbounded => true,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::forever(DEFAULT_RETRY_DELAY)
    }
}

/// Run `op` until it succeeds or the policy runs out of retries.
///
/// Waits `policy.delay` between attempts; the delay is fixed, with no
/// back-off. On exhaustion the last error is returned.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut retries: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !policy.allows(retries) => return Err(e),
            Err(e) => {
                retries = retries.saturating_add(1);
                warn!(retry = retries, delay_ms = policy.delay.as_millis() as u64, error = %e, "Operation failed, retrying");
            }
        }
        tokio::time::sleep(policy.delay).await;
    }
}
