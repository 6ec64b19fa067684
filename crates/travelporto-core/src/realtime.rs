//! Periodic refresh of a stop's realtime arrivals.
//!
//! While a consumer watches a stop, the watch invalidates that stop's cached
//! realtime board every interval, fetches it again and sends the new board
//! over a channel. Refresh failures are logged and skipped; the consumer keeps
//! showing the last board it received.

use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::models::RealtimeArrival;

/// Time between realtime refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// A refreshed realtime board.
#[derive(Debug, Clone)]
pub struct RealtimeUpdate {
    pub stop_id: String,
    pub arrivals: Arc<Vec<RealtimeArrival>>,
}

/// Cooperative cancellation flag shared between a consumer and the work it
/// started.
///
/// Releasing the token never aborts a request; it only tells whoever holds a
/// result that nobody wants it anymore.
#[derive(Debug, Clone)]
pub struct InterestToken(Arc<AtomicBool>);

impl InterestToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_interested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Hand `value` to `apply` only if the consumer is still interested.
    pub fn apply<T>(&self, value: T, apply: impl FnOnce(T)) -> bool {
        if self.is_interested() {
            apply(value);
            true
        } else {
            false
        }
    }
}

impl Default for InterestToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a running realtime refresh loop. Dropping it stops the loop.
pub struct RealtimeWatch {
    stop_id: String,
    token: InterestToken,
    handle: JoinHandle<()>,
}

impl RealtimeWatch {
    /// Start refreshing `stop_id` every `period` on the current tokio runtime.
    ///
    /// `refresh` must invalidate and re-fetch the board. The first refresh
    /// happens one `period` after the call; the initial board is the
    /// consumer's own foreground fetch.
    pub fn spawn<F, Fut, E>(
        stop_id: String,
        period: Duration,
        refresh: F,
        updates: mpsc::Sender<RealtimeUpdate>,
    ) -> Self
    where
        F: Fn(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Arc<Vec<RealtimeArrival>>, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let token = InterestToken::new();
        let loop_token = token.clone();
        let loop_stop_id = stop_id.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !loop_token.is_interested() {
                    break;
                }

                let arrivals = match refresh(loop_stop_id.clone()).await {
                    Ok(arrivals) => arrivals,
                    Err(e) => {
                        debug!(stop_id = %loop_stop_id, error = %e, "Realtime refresh failed, keeping previous arrivals");
                        continue;
                    }
                };

                if !loop_token.is_interested() {
                    break;
                }
                debug!(stop_id = %loop_stop_id, count = arrivals.len(), "Realtime arrivals refreshed");
                let update = RealtimeUpdate {
                    stop_id: loop_stop_id.clone(),
                    arrivals,
                };
                if updates.send(update).await.is_err() {
                    debug!(stop_id = %loop_stop_id, "Realtime consumer gone, stopping refresh");
                    break;
                }
            }
        });

        Self { stop_id, token, handle }
    }

    pub fn stop_id(&self) -> &str {
        &self.stop_id
    }

    /// Token a consumer can check before applying an update.
    pub fn interest(&self) -> InterestToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Stop refreshing. A request already in flight is left to finish in the
    /// cache; only this watch's interest in it ends.
    pub fn stop(self) {
        // Drop does the work
    }
}

impl Drop for RealtimeWatch {
    fn drop(&mut self) {
        self.token.release();
        self.handle.abort();
    }
}
