use async_trait::async_trait;

use crate::models::{RealtimeArrival, Route, RouteStops, ScheduledArrival, Stop};

use super::ApiError;

/// Backend operations consumed by the request caches.
///
/// `ApiClient` is the production implementation; tests plug in in-memory
/// fakes.
#[async_trait]
pub trait TransitApi: Send + Sync {
    async fn fetch_stops(&self) -> Result<Vec<Stop>, ApiError>;

    async fn fetch_routes(&self) -> Result<Vec<Route>, ApiError>;

    /// Complete stop listing of a route, all directions.
    async fn fetch_route_stops(&self, route_id: &str) -> Result<RouteStops, ApiError>;

    /// Stop listing of a single direction/headsign of a route.
    async fn fetch_route_direction_stops(
        &self,
        route_id: &str,
        direction_id: u32,
        headsign: &str,
    ) -> Result<RouteStops, ApiError>;

    async fn fetch_scheduled_arrivals(&self, stop_id: &str) -> Result<Vec<ScheduledArrival>, ApiError>;

    async fn fetch_realtime_arrivals(&self, stop_id: &str) -> Result<Vec<RealtimeArrival>, ApiError>;
}
