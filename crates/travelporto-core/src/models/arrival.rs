//! Arrival board models and the merge used to display them.
//!
//! A stop has two boards: the timetable (`ScheduledArrival`) and live vehicle
//! predictions (`RealtimeArrival`). When both mention the same trip, the live
//! prediction wins.

use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TripRef {
    pub id: String,
    pub route_id: String,
    #[serde(default)]
    pub headsign: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ArrivalStop {
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ScheduledArrival {
    pub trip: TripRef,
    pub stop: ArrivalStop,
    pub arrival_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct RealtimeArrival {
    pub trip: TripRef,
    pub stop: ArrivalStop,
    pub realtime_arrival_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ArrivalKind {
    Realtime,
    Scheduled,
}

/// One row of a stop's merged arrival board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayArrival {
    pub kind: ArrivalKind,
    pub route_id: String,
    pub trip_id: String,
    pub headsign: String,
    pub arrival_time: String,
    pub key: String,
}

impl DisplayArrival {
    /// Arrival time trimmed to `HH:MM`.
    pub fn display_time(&self) -> &str {
        self.arrival_time.get(..5).unwrap_or(&self.arrival_time)
    }

    /// Whole minutes from `now` until this arrival.
    ///
    /// GTFS service days run past midnight, so hours of 24 and above are
    /// accepted. Returns `None` for unparseable times.
    pub fn minutes_until(&self, now: NaiveTime) -> Option<i64> {
        let arrival = parse_service_seconds(&self.arrival_time)?;
        let now = i64::from(now.num_seconds_from_midnight());
        Some((arrival - now).div_euclid(60))
    }
}

/// Service days never run past this hour of the following day.
const MAX_SERVICE_HOURS: i64 = 48;

/// Seconds since midnight for an `HH:MM[:SS]` service time.
fn parse_service_seconds(time: &str) -> Option<i64> {
    let mut parts = time.trim().split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    if parts.next().is_some()
        || !(0..MAX_SERVICE_HOURS).contains(&hours)
        || !(0..60).contains(&minutes)
        || !(0..60).contains(&seconds)
    {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Merge both boards into display order.
///
/// Realtime rows come first; scheduled rows are kept only for trips that have
/// no realtime prediction.
pub fn merge_arrivals(
    scheduled: &[ScheduledArrival],
    realtime: &[RealtimeArrival],
) -> Vec<DisplayArrival> {
    let realtime_trips: HashSet<&str> = realtime.iter().map(|r| r.trip.id.as_str()).collect();

    let live = realtime.iter().map(|r| DisplayArrival {
        kind: ArrivalKind::Realtime,
        route_id: r.trip.route_id.clone(),
        trip_id: r.trip.id.clone(),
        headsign: r.trip.headsign.clone().unwrap_or_default(),
        arrival_time: r.realtime_arrival_time.clone(),
        key: format!("realtime-{}-{}-{}", r.trip.id, r.stop.sequence, r.realtime_arrival_time),
    });

    let timetable = scheduled
        .iter()
        .filter(|s| !realtime_trips.contains(s.trip.id.as_str()))
        .map(|s| DisplayArrival {
            kind: ArrivalKind::Scheduled,
            route_id: s.trip.route_id.clone(),
            trip_id: s.trip.id.clone(),
            headsign: s.trip.headsign.clone().unwrap_or_default(),
            arrival_time: s.arrival_time.clone(),
            key: format!("scheduled-{}-{}-{}", s.trip.id, s.stop.sequence, s.arrival_time),
        });

    live.chain(timetable).collect()
}

/// Sorted, de-duplicated route ids present on a board.
pub fn route_ids(arrivals: &[DisplayArrival]) -> Vec<String> {
    arrivals
        .iter()
        .map(|a| a.route_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
