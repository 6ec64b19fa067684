use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::models::RouteStops;

/// Map from stop id to the ids of every route serving it.
///
/// Sets only grow while an index is being built; once built the index is
/// shared read-only behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteStopIndex {
    routes_by_stop: HashMap<String, BTreeSet<String>>,
}

impl RouteStopIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, stop_id: &str, route_id: &str) {
        self.routes_by_stop
            .entry(stop_id.to_string())
            .or_default()
            .insert(route_id.to_string());
    }

    /// Add every stop of every direction of `route_id`'s listing.
    pub fn merge_route(&mut self, route_id: &str, listing: &RouteStops) {
        for stop_id in listing.stop_ids() {
            self.insert(stop_id, route_id);
        }
    }

    pub fn routes_for_stop(&self, stop_id: &str) -> Option<&BTreeSet<String>> {
        self.routes_by_stop.get(stop_id)
    }

    pub fn contains_stop(&self, stop_id: &str) -> bool {
        self.routes_by_stop.contains_key(stop_id)
    }

    /// Number of indexed stops.
    pub fn len(&self) -> usize {
        self.routes_by_stop.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes_by_stop.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.routes_by_stop.iter()
    }
}
