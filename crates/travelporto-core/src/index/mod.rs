//! Stop → routes index derived from the per-route stop listings.
//!
//! The backend has no "routes serving this stop" endpoint, so the client
//! builds one by fetching the stop listing of every route. The build runs once
//! per `RouteStopIndexer` and the result is shared by every reader after that.

pub mod builder;
pub mod route_stops;

pub use builder::{build_route_stop_index, IndexState, RouteStopIndexer, DEFAULT_FAN_OUT_CONCURRENCY};
pub use route_stops::RouteStopIndex;
