//! travelporto-core - data layer for the STCP (Porto) bus network.
//!
//! Front-ends construct one `TransitData` and ask it for stops, routes and
//! arrival boards. It collapses concurrent requests for the same resource into
//! one backend call, keeps successful results for the life of the process,
//! builds the stop → routes index in the background and refreshes realtime
//! arrivals while a stop is being watched.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod index;
pub mod models;
pub mod realtime;
pub mod saved_stops;
pub mod search;
pub mod service;
pub mod tasks;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, SharedError, TransitApi};
pub use config::Config;
pub use index::{IndexState, RouteStopIndex};
pub use realtime::{InterestToken, RealtimeUpdate, RealtimeWatch};
pub use saved_stops::SavedStops;
pub use service::{DataSettings, StopBoard, TransitData};
