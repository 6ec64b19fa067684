//! The data layer the front-ends talk to.
//!
//! `TransitData` owns one cache per backend resource and the route-stop
//! indexer. It is cheap to clone; clones share every cache, so a request
//! started from one screen is joined by any other screen asking for the same
//! thing.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, SharedError, TransitApi};
use crate::cache::{KeyedSingleFlight, Pending, SingleFlight};
use crate::config::Config;
use crate::index::{IndexState, RouteStopIndex, RouteStopIndexer, DEFAULT_FAN_OUT_CONCURRENCY};
use crate::models::{
    merge_arrivals, route_ids, DisplayArrival, RealtimeArrival, Route, RouteStops, ScheduledArrival, Stop,
};
use crate::realtime::{RealtimeUpdate, RealtimeWatch, DEFAULT_REFRESH_INTERVAL};
use crate::search::filter_stops_by_query;
use crate::tasks::retry::DEFAULT_RETRY_DELAY;
use crate::tasks::RetryPolicy;

type StopsCache = SingleFlight<Arc<Vec<Stop>>, SharedError>;
type RoutesCache = SingleFlight<Arc<Vec<Route>>, SharedError>;

/// Route id, direction id, headsign
type DirectionKey = (String, u32, String);

/// Tunables of the request layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataSettings {
    /// Route listings fetched at once while building the index
    pub fan_out_concurrency: usize,
    /// Wait between attempts of a background fetch
    pub retry_delay: Duration,
    /// Period of the realtime refresh loop
    pub refresh_interval: Duration,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            fan_out_concurrency: DEFAULT_FAN_OUT_CONCURRENCY,
            retry_delay: DEFAULT_RETRY_DELAY,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }
}

/// Everything a stop screen shows.
#[derive(Debug, Clone)]
pub struct StopBoard {
    pub stop_id: String,
    pub scheduled: Arc<Vec<ScheduledArrival>>,
    pub realtime: Arc<Vec<RealtimeArrival>>,
    /// Set when realtime arrivals could not be fetched and the board fell
    /// back to the timetable.
    pub realtime_error: Option<SharedError>,
    pub arrivals: Vec<DisplayArrival>,
}

impl StopBoard {
    pub fn route_ids(&self) -> Vec<String> {
        route_ids(&self.arrivals)
    }

    pub fn has_realtime(&self) -> bool {
        !self.realtime.is_empty()
    }
}

struct Inner {
    api: Arc<dyn TransitApi>,
    stops: StopsCache,
    // Shared with the index build so the build does not own the data layer
    routes: Arc<RoutesCache>,
    direction_stops: KeyedSingleFlight<DirectionKey, Arc<RouteStops>, SharedError>,
    scheduled: KeyedSingleFlight<String, Arc<Vec<ScheduledArrival>>, SharedError>,
    realtime: KeyedSingleFlight<String, Arc<Vec<RealtimeArrival>>, SharedError>,
    indexer: RouteStopIndexer,
    settings: DataSettings,
}

#[derive(Clone)]
pub struct TransitData {
    inner: Arc<Inner>,
}

impl TransitData {
    pub fn new(api: Arc<dyn TransitApi>, settings: DataSettings) -> Self {
        let retry = RetryPolicy::forever(settings.retry_delay);
        Self {
            inner: Arc::new(Inner {
                api,
                stops: SingleFlight::new("stops"),
                routes: Arc::new(SingleFlight::new("routes")),
                direction_stops: KeyedSingleFlight::new("route_direction_stops"),
                scheduled: KeyedSingleFlight::new("scheduled_arrivals"),
                realtime: KeyedSingleFlight::new("realtime_arrivals"),
                indexer: RouteStopIndexer::new(settings.fan_out_concurrency, retry),
                settings,
            }),
        }
    }

    /// Build the HTTP client and data layer from the user's configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.base_url()?;
        let api_key = config.api_key()?;
        let client = ApiClient::new(&base_url, &api_key, config.request_timeout())?;
        info!(base_url = %base_url, "Transit data layer ready");
        Ok(Self::new(Arc::new(client), config.data_settings()))
    }

    pub fn settings(&self) -> DataSettings {
        self.inner.settings
    }

    pub fn get_stops(&self) -> Pending<Arc<Vec<Stop>>, SharedError> {
        let api = Arc::clone(&self.inner.api);
        self.inner.stops.get(move || async move {
            api.fetch_stops()
                .await
                .map(Arc::new)
                .map_err(|e| failed("stops", "all", e))
        })
    }

    pub fn get_routes(&self) -> Pending<Arc<Vec<Route>>, SharedError> {
        load_routes(&self.inner.routes, &self.inner.api)
    }

    /// Ordered stop listing of one direction of a route.
    pub fn get_route_direction_stops(
        &self,
        route_id: &str,
        direction_id: u32,
        headsign: &str,
    ) -> Pending<Arc<RouteStops>, SharedError> {
        let api = Arc::clone(&self.inner.api);
        let key = (route_id.to_string(), direction_id, headsign.to_string());
        let (route_id, headsign) = (key.0.clone(), key.2.clone());
        self.inner.direction_stops.get(key, move || async move {
            api.fetch_route_direction_stops(&route_id, direction_id, &headsign)
                .await
                .map(Arc::new)
                .map_err(|e| failed("route_direction_stops", &route_id, e))
        })
    }

    pub fn get_scheduled_arrivals(&self, stop_id: &str) -> Pending<Arc<Vec<ScheduledArrival>>, SharedError> {
        let api = Arc::clone(&self.inner.api);
        let id = stop_id.to_string();
        self.inner.scheduled.get(stop_id.to_string(), move || async move {
            api.fetch_scheduled_arrivals(&id)
                .await
                .map(Arc::new)
                .map_err(|e| failed("scheduled_arrivals", &id, e))
        })
    }

    pub fn get_realtime_arrivals(&self, stop_id: &str) -> Pending<Arc<Vec<RealtimeArrival>>, SharedError> {
        let api = Arc::clone(&self.inner.api);
        let id = stop_id.to_string();
        self.inner.realtime.get(stop_id.to_string(), move || async move {
            api.fetch_realtime_arrivals(&id)
                .await
                .map(Arc::new)
                .map_err(|e| failed("realtime_arrivals", &id, e))
        })
    }

    /// Forget the cached realtime board of one stop. Returns whether there
    /// was one.
    pub fn invalidate_realtime_arrivals(&self, stop_id: &str) -> bool {
        self.inner.realtime.invalidate(&stop_id.to_string())
    }

    /// Invalidate and re-fetch one stop's realtime board.
    pub fn refresh_realtime_arrivals(&self, stop_id: &str) -> Pending<Arc<Vec<RealtimeArrival>>, SharedError> {
        self.invalidate_realtime_arrivals(stop_id);
        self.get_realtime_arrivals(stop_id)
    }

    /// Scheduled and realtime arrivals of a stop, merged for display.
    ///
    /// The timetable is required. Realtime predictions are optional: when
    /// they fail the board shows the timetable alone.
    pub async fn get_stop_arrivals(&self, stop_id: &str) -> Result<StopBoard, SharedError> {
        let (scheduled, realtime) = futures::join!(
            self.get_scheduled_arrivals(stop_id),
            self.get_realtime_arrivals(stop_id)
        );
        let scheduled = scheduled?;
        let (realtime, realtime_error) = match realtime {
            Ok(realtime) => (realtime, None),
            Err(e) => {
                debug!(stop_id, error = %e, "Showing timetable without realtime arrivals");
                (Arc::new(Vec::new()), Some(e))
            }
        };

        let arrivals = merge_arrivals(&scheduled, &realtime);
        Ok(StopBoard {
            stop_id: stop_id.to_string(),
            scheduled,
            realtime,
            realtime_error,
            arrivals,
        })
    }

    /// The shared route-stop index build, started on first call.
    pub fn get_route_stop_index(&self) -> Pending<Arc<RouteStopIndex>, Infallible> {
        self.inner
            .indexer
            .get(Arc::clone(&self.inner.api), self.routes_loader())
    }

    /// Await the route-stop index, building it if needed.
    pub async fn wait_route_stop_index(&self) -> Arc<RouteStopIndex> {
        match self.get_route_stop_index().await {
            Ok(index) => index,
            Err(never) => match never {},
        }
    }

    /// The index if it has been built, without waiting.
    pub fn route_stop_index(&self) -> Option<Arc<RouteStopIndex>> {
        self.inner.indexer.peek()
    }

    /// Routes serving `stop_id`, if the index is built.
    pub fn routes_for_stop(&self, stop_id: &str) -> Option<Vec<String>> {
        let index = self.route_stop_index()?;
        Some(
            index
                .routes_for_stop(stop_id)
                .map(|routes| routes.iter().cloned().collect())
                .unwrap_or_default(),
        )
    }

    pub fn index_state(&self) -> IndexState {
        self.inner.indexer.state()
    }

    pub fn is_index_loading(&self) -> bool {
        self.inner.indexer.is_loading()
    }

    /// Start the index build in the background on the current runtime.
    pub fn prefetch_route_stop_index(&self) {
        self.inner
            .indexer
            .spawn_build(Arc::clone(&self.inner.api), self.routes_loader());
    }

    /// Route list loader for the index build. It holds the routes cache, not
    /// the whole data layer.
    fn routes_loader(&self) -> impl Fn() -> Pending<Arc<Vec<Route>>, SharedError> + Send + Sync + 'static {
        let routes = Arc::clone(&self.inner.routes);
        let api = Arc::clone(&self.inner.api);
        move || load_routes(&routes, &api)
    }

    /// Refresh `stop_id`'s realtime board periodically and send every new
    /// board to `updates`. The refresh stops when the watch is dropped.
    pub fn watch_realtime_arrivals(&self, stop_id: &str, updates: mpsc::Sender<RealtimeUpdate>) -> RealtimeWatch {
        let data = self.clone();
        RealtimeWatch::spawn(
            stop_id.to_string(),
            self.inner.settings.refresh_interval,
            move |stop_id: String| data.refresh_realtime_arrivals(&stop_id),
            updates,
        )
    }

    /// Stops whose name or id matches `query`.
    pub async fn search_stops(&self, query: &str) -> Result<Vec<Stop>, SharedError> {
        let stops = self.get_stops().await?;
        Ok(filter_stops_by_query(&stops, query))
    }
}

fn load_routes(cache: &RoutesCache, api: &Arc<dyn TransitApi>) -> Pending<Arc<Vec<Route>>, SharedError> {
    let api = Arc::clone(api);
    cache.get(move || async move {
        api.fetch_routes()
            .await
            .map(Arc::new)
            .map_err(|e| failed("routes", "all", e))
    })
}

fn failed(resource: &str, key: &str, e: ApiError) -> SharedError {
    warn!(resource, key, error = %e, "Fetch failed");
    Arc::new(e)
}
