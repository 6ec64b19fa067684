//! In-memory request caches.
//!
//! This module provides single-flight caches that collapse concurrent
//! requests for the same resource into one backend call:
//!
//! - `SingleFlight`: one slot, for collections with no natural key
//!   (all stops, all routes)
//! - `KeyedSingleFlight`: one slot per key (arrivals per stop)
//!
//! Successful results stay cached until invalidated. A failed request clears
//! its slot before the error reaches any caller, so the next call starts over.

pub mod keyed;
pub mod single_flight;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use keyed::{KeyedSingleFlight, Pending};
pub use single_flight::SingleFlight;

/// Lock a cache mutex. A panic while holding the lock cannot leave the slot
/// map half-updated, so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
