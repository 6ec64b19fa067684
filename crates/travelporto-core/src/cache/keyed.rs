use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tracing::debug;

use super::lock;

/// A cached request. Every clone resolves to the same result.
pub type Pending<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// Slot for one key. The generation tells a finishing request whether the
/// slot still belongs to it.
struct Slot<V, E> {
    generation: u64,
    pending: Pending<V, E>,
}

type SlotMap<K, V, E> = Mutex<HashMap<K, Slot<V, E>>>;

/// Single-flight cache with an independent slot per key.
///
/// At most one request per key is in flight; concurrent callers share it.
/// Successful results are kept until `invalidate`. A failed request removes
/// its own slot before resolving, so every caller of that generation sees the
/// same error and the next `get` issues a fresh request.
pub struct KeyedSingleFlight<K, V, E> {
    name: &'static str,
    slots: Arc<SlotMap<K, V, E>>,
    next_generation: AtomicU64,
}

impl<K, V, E> KeyedSingleFlight<K, V, E>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cache. `name` only labels log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Return the cached request for `key`, or start one with `fetch`.
    ///
    /// `fetch` is only called when the key has no slot. It runs under the
    /// cache lock, so it must only build the future and never call back into
    /// this cache.
    pub fn get<F, Fut>(&self, key: K, fetch: F) -> Pending<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let mut slots = lock(&self.slots);
        if let Some(slot) = slots.get(&key) {
            debug!(cache = self.name, key = ?key, "Joining cached request");
            return slot.pending.clone();
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, key = ?key, generation, "Starting request");

        let request = fetch();
        let owner: Weak<SlotMap<K, V, E>> = Arc::downgrade(&self.slots);
        let cleanup_key = key.clone();
        let name = self.name;

        let pending = async move {
            let result = request.await;
            if result.is_err() {
                if let Some(slots) = owner.upgrade() {
                    let mut slots = lock(&slots);
                    let owned = slots
                        .get(&cleanup_key)
                        .is_some_and(|slot| slot.generation == generation);
                    if owned {
                        slots.remove(&cleanup_key);
                    }
                }
                debug!(cache = name, key = ?cleanup_key, generation, "Request failed, slot cleared");
            }
            result
        }
        .boxed()
        .shared();

        slots.insert(
            key,
            Slot {
                generation,
                pending: pending.clone(),
            },
        );
        pending
    }

    /// Drop the slot for `key`, pending or settled. Other keys are untouched.
    /// Callers already awaiting the old request still receive its result.
    pub fn invalidate(&self, key: &K) -> bool {
        let removed = lock(&self.slots).remove(key).is_some();
        if removed {
            debug!(cache = self.name, key = ?key, "Invalidated");
        }
        removed
    }

    /// The settled successful value for `key`, if there is one.
    pub fn peek(&self, key: &K) -> Option<V> {
        let slots = lock(&self.slots);
        let slot = slots.get(key)?;
        match slot.pending.peek() {
            Some(Ok(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// True while a request for `key` is cached but not yet resolved.
    pub fn is_pending(&self, key: &K) -> bool {
        lock(&self.slots)
            .get(key)
            .is_some_and(|slot| slot.pending.peek().is_none())
    }

    pub fn contains(&self, key: &K) -> bool {
        lock(&self.slots).contains_key(key)
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every slot.
    pub fn clear(&self) {
        lock(&self.slots).clear();
    }
}
