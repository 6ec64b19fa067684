use std::future::Future;

use super::keyed::{KeyedSingleFlight, Pending};

/// Single-flight cache for a resource with no natural key.
///
/// Same contract as `KeyedSingleFlight` with exactly one slot: the first
/// successful result is kept for the life of the cache.
pub struct SingleFlight<V, E> {
    inner: KeyedSingleFlight<(), V, E>,
}

impl<V, E> SingleFlight<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(name: &'static str) -> Self {
        Self {
            inner: KeyedSingleFlight::new(name),
        }
    }

    /// Return the cached request, or start one with `fetch`.
    pub fn get<F, Fut>(&self, fetch: F) -> Pending<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.inner.get((), fetch)
    }

    pub fn peek(&self) -> Option<V> {
        self.inner.peek(&())
    }

    pub fn is_pending(&self) -> bool {
        self.inner.is_pending(&())
    }

    /// True once a request has been started and not cleared by a failure.
    pub fn is_started(&self) -> bool {
        self.inner.contains(&())
    }
}
