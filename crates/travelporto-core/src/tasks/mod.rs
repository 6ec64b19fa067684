//! Async job helpers for fan-out fetches.
//!
//! - `run_with_concurrency`: run a batch of jobs with a bounded number in
//!   flight, keeping results in input order and tolerating individual failures
//! - `with_retry`: re-run a failing job after a fixed delay, up to a limit or
//!   forever

pub mod retry;
pub mod runner;

pub use retry::{with_retry, RetryLimit, RetryPolicy};
pub use runner::run_with_concurrency;
