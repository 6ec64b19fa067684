//! Route and route stop listing models.

use serde::{Deserialize, Serialize};

/// Colour used when the backend sends an empty colour field.
const DEFAULT_COLOR: &str = "#000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RouteDirection {
    pub direction_id: u32,
    pub headsign: String,
    #[serde(default)]
    pub service_days: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Route {
    pub id: String,
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub route_color: String,
    #[serde(default)]
    pub route_text_color: String,
    #[serde(default)]
    pub directions: Vec<RouteDirection>,
}

impl Route {
    /// Route colour normalised to `#rrggbb` form.
    pub fn hex_color(&self) -> String {
        to_hex(&self.route_color)
    }

    pub fn hex_text_color(&self) -> String {
        to_hex(&self.route_text_color)
    }
}

fn to_hex(color: &str) -> String {
    let trimmed = color.trim();
    if trimmed.is_empty() {
        DEFAULT_COLOR.to_string()
    } else if trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{}", trimmed)
    }
}

/// Minimal stop reference embedded in a route stop listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct StopRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RouteStopItem {
    pub sequence: u32,
    pub stop: StopRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RouteStopsDirection {
    pub direction_id: u32,
    pub headsign: String,
    #[serde(default)]
    pub stops: Vec<RouteStopItem>,
}

impl RouteStopsDirection {
    pub fn matches(&self, direction_id: u32, headsign: &str) -> bool {
        self.direction_id == direction_id && self.headsign == headsign
    }

    /// Stops ordered by their position along the direction.
    pub fn sorted_stops(&self) -> Vec<&RouteStopItem> {
        let mut stops: Vec<&RouteStopItem> = self.stops.iter().collect();
        stops.sort_by_key(|item| item.sequence);
        stops
    }
}

/// Stop listing of a route, grouped by direction and headsign.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RouteStops {
    #[serde(default)]
    pub directions: Vec<RouteStopsDirection>,
}

impl RouteStops {
    pub fn direction(&self, direction_id: u32, headsign: &str) -> Option<&RouteStopsDirection> {
        self.directions.iter().find(|d| d.matches(direction_id, headsign))
    }

    /// Every stop id served by the route, across all directions.
    pub fn stop_ids(&self) -> impl Iterator<Item = &str> {
        self.directions
            .iter()
            .flat_map(|d| d.stops.iter())
            .map(|item| item.stop.id.as_str())
    }
}
