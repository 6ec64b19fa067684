use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future::join_all;
use tracing::debug;

/// Run `tasks` with at most `limit` in flight at once.
///
/// Workers claim task indices from a shared cursor that only moves forward,
/// so every task is started exactly once. A failing task leaves `None` in its
/// slot and never stops the rest of the batch. The returned vector has one
/// entry per task, in input order regardless of completion order.
///
/// A `limit` of zero is treated as one.
pub async fn run_with_concurrency<T, E, F, Fut>(tasks: Vec<F>, limit: usize) -> Vec<Option<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let total = tasks.len();
    let slots: Vec<Mutex<Option<F>>> = tasks.into_iter().map(|t| Mutex::new(Some(t))).collect();
    let cursor = AtomicUsize::new(0);
    let (slots, cursor) = (&slots, &cursor);

    let worker = move || async move {
        let mut completed: Vec<(usize, T)> = Vec::new();
        loop {
            let index = cursor.fetch_add(1, Ordering::Relaxed);
            if index >= total {
                break;
            }
            let task = slots[index]
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take();
            let Some(task) = task else { continue };

            match task().await {
                Ok(value) => completed.push((index, value)),
                Err(e) => debug!(task = index, error = %e, "Task failed, leaving slot empty"),
            }
        }
        completed
    };

    let worker_count = limit.max(1).min(total);
    let finished = join_all((0..worker_count).map(|_| worker())).await;

    let mut results: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
    for (index, value) in finished.into_iter().flatten() {
        results[index] = Some(value);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::BoxFuture;
    use futures::FutureExt;

    type Task = Box<dyn FnOnce() -> BoxFuture<'static, Result<&'static str, String>>>;

    fn delayed(value: Result<&'static str, String>, delay_ms: u64) -> Task {
        Box::new(move || {
            async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                value
            }
            .boxed()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_keep_task_order_with_failures() {
        // "a" finishes last, "c" first; order must follow the input
        let tasks = vec![
            delayed(Ok("a"), 300),
            delayed(Err("boom".to_string()), 100),
            delayed(Ok("c"), 10),
        ];

        let results = run_with_concurrency(tasks, 2).await;
        assert_eq!(results, vec![Some("a"), None, Some("c")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_limit() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                let started = Arc::clone(&started);
                move || async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50 + i * 10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, String>(i)
                }
            })
            .collect();

        let results = run_with_concurrency(tasks, 2).await;

        assert_eq!(results, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(started.load(Ordering::SeqCst), 5);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_and_zero_limit() {
        let none: Vec<Task> = Vec::new();
        assert!(run_with_concurrency(none, 3).await.is_empty());

        let results = run_with_concurrency(vec![delayed(Ok("only"), 0)], 0).await;
        assert_eq!(results, vec![Some("only")]);
    }

    #[tokio::test]
    async fn test_all_failures_still_resolve() {
        let tasks = vec![
            delayed(Err("one".to_string()), 0),
            delayed(Err("two".to_string()), 0),
        ];
        assert_eq!(run_with_concurrency(tasks, 4).await, vec![None, None]);
    }
}
