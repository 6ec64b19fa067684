//! Data models for the STCP transit API.
//!
//! This module contains the typed shapes of every value the request caches
//! hand out:
//!
//! - `Stop`, `Coordinates`: bus stops with their position and fare zone
//! - `Route`, `RouteDirection`: lines and the directions they run in
//! - `RouteStops`, `RouteStopItem`: the ordered stop listing of a route
//! - `ScheduledArrival`, `RealtimeArrival`: per-stop arrival boards
//!
//! All responses arrive wrapped in an `Envelope { data }`.

pub mod arrival;
pub mod route;
pub mod stop;

use serde::Deserialize;

pub use arrival::{merge_arrivals, route_ids, ArrivalKind, ArrivalStop, DisplayArrival, RealtimeArrival, ScheduledArrival, TripRef};
pub use route::{Route, RouteDirection, RouteStopItem, RouteStops, RouteStopsDirection, StopRef};
pub use stop::{Coordinates, Stop};

/// JSON envelope every backend endpoint wraps its payload in.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}
