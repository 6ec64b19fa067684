//! In-memory `TransitApi` used by the unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::{ApiError, TransitApi};
use crate::models::{
    ArrivalStop, Coordinates, RealtimeArrival, Route, RouteStopItem, RouteStops, RouteStopsDirection,
    ScheduledArrival, Stop, StopRef, TripRef,
};

/// Fake backend with per-endpoint call counters and injectable failures.
///
/// Endpoint keys: `stops`, `routes`, `route_stops:<route>`,
/// `direction_stops:<route>`, `scheduled:<stop>`, `realtime:<stop>`.
#[derive(Default)]
pub struct FakeApi {
    stops: Vec<Stop>,
    routes: Vec<Route>,
    route_stops: HashMap<String, RouteStops>,
    scheduled: HashMap<String, Vec<ScheduledArrival>>,
    realtime: Mutex<HashMap<String, Vec<RealtimeArrival>>>,
    failures: Mutex<HashMap<String, u32>>,
    calls: Mutex<HashMap<String, usize>>,
    latency: Duration,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            latency: Duration::from_millis(10),
            ..Self::default()
        }
    }

    pub fn with_stops(mut self, ids: &[&str]) -> Self {
        self.stops = ids.iter().map(|id| stop(id, &format!("Stop {}", id))).collect();
        self
    }

    pub fn with_named_stops(mut self, stops: Vec<Stop>) -> Self {
        self.stops = stops;
        self
    }

    /// Add a route serving `stops` in a single direction.
    pub fn with_route(mut self, route_id: &str, stops: &[&str]) -> Self {
        self.routes.push(route(route_id));
        self.route_stops.insert(route_id.to_string(), route_stops(stops));
        self
    }

    pub fn with_scheduled(mut self, stop_id: &str, arrivals: Vec<ScheduledArrival>) -> Self {
        self.scheduled.insert(stop_id.to_string(), arrivals);
        self
    }

    pub fn with_realtime(self, stop_id: &str, arrivals: Vec<RealtimeArrival>) -> Self {
        self.set_realtime(stop_id, arrivals);
        self
    }

    pub fn set_realtime(&self, stop_id: &str, arrivals: Vec<RealtimeArrival>) {
        self.realtime.lock().unwrap().insert(stop_id.to_string(), arrivals);
    }

    /// Make the next `count` calls to `endpoint` fail with a server error.
    pub fn fail_next(&self, endpoint: &str, count: u32) {
        self.failures.lock().unwrap().insert(endpoint.to_string(), count);
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls.lock().unwrap().get(endpoint).copied().unwrap_or(0)
    }

    async fn respond<T>(&self, endpoint: String, value: Option<T>) -> Result<T, ApiError> {
        *self.calls.lock().unwrap().entry(endpoint.clone()).or_default() += 1;
        tokio::time::sleep(self.latency).await;

        let injected = {
            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(&endpoint) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if injected {
            return Err(ApiError::ServerError(format!("injected failure for {}", endpoint)));
        }
        value.ok_or(ApiError::NotFound(endpoint))
    }
}

#[async_trait]
impl TransitApi for FakeApi {
    async fn fetch_stops(&self) -> Result<Vec<Stop>, ApiError> {
        self.respond("stops".to_string(), Some(self.stops.clone())).await
    }

    async fn fetch_routes(&self) -> Result<Vec<Route>, ApiError> {
        self.respond("routes".to_string(), Some(self.routes.clone())).await
    }

    async fn fetch_route_stops(&self, route_id: &str) -> Result<RouteStops, ApiError> {
        let value = self.route_stops.get(route_id).cloned();
        self.respond(format!("route_stops:{}", route_id), value).await
    }

    async fn fetch_route_direction_stops(
        &self,
        route_id: &str,
        direction_id: u32,
        headsign: &str,
    ) -> Result<RouteStops, ApiError> {
        let value = self.route_stops.get(route_id).map(|listing| RouteStops {
            directions: listing
                .directions
                .iter()
                .filter(|d| d.matches(direction_id, headsign))
                .cloned()
                .collect(),
        });
        self.respond(format!("direction_stops:{}", route_id), value).await
    }

    async fn fetch_scheduled_arrivals(&self, stop_id: &str) -> Result<Vec<ScheduledArrival>, ApiError> {
        let value = self.scheduled.get(stop_id).cloned();
        self.respond(format!("scheduled:{}", stop_id), value).await
    }

    async fn fetch_realtime_arrivals(&self, stop_id: &str) -> Result<Vec<RealtimeArrival>, ApiError> {
        let value = self.realtime.lock().unwrap().get(stop_id).cloned();
        self.respond(format!("realtime:{}", stop_id), value).await
    }
}

pub fn stop(id: &str, name: &str) -> Stop {
    Stop {
        id: id.to_string(),
        name: name.to_string(),
        coordinates: Coordinates {
            latitude: 41.15,
            longitude: -8.61,
        },
        zone_id: "PRT1".to_string(),
    }
}

pub fn route(id: &str) -> Route {
    Route {
        id: id.to_string(),
        short_name: id.to_string(),
        long_name: format!("Line {}", id),
        route_color: "1E90FF".to_string(),
        route_text_color: "FFFFFF".to_string(),
        directions: vec![crate::models::RouteDirection {
            direction_id: 0,
            headsign: "outbound".to_string(),
            service_days: vec![],
        }],
    }
}

/// Single-direction listing (direction 0, headsign "outbound") of `stops`.
pub fn route_stops(stops: &[&str]) -> RouteStops {
    RouteStops {
        directions: vec![RouteStopsDirection {
            direction_id: 0,
            headsign: "outbound".to_string(),
            stops: stops
                .iter()
                .enumerate()
                .map(|(i, id)| RouteStopItem {
                    sequence: i as u32 + 1,
                    stop: StopRef {
                        id: id.to_string(),
                        name: format!("Stop {}", id),
                    },
                })
                .collect(),
        }],
    }
}

pub fn scheduled(trip_id: &str, route_id: &str, time: &str) -> ScheduledArrival {
    ScheduledArrival {
        trip: TripRef {
            id: trip_id.to_string(),
            route_id: route_id.to_string(),
            headsign: None,
        },
        stop: ArrivalStop { sequence: 1 },
        arrival_time: time.to_string(),
    }
}

pub fn realtime(trip_id: &str, route_id: &str, time: &str) -> RealtimeArrival {
    RealtimeArrival {
        trip: TripRef {
            id: trip_id.to_string(),
            route_id: route_id.to_string(),
            headsign: None,
        },
        stop: ArrivalStop { sequence: 1 },
        realtime_arrival_time: time.to_string(),
    }
}
