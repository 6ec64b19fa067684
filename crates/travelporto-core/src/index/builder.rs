use std::convert::Infallible;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{ApiError, TransitApi};
use crate::cache::{Pending, SingleFlight};
use crate::models::Route;
use crate::tasks::{run_with_concurrency, with_retry, RetryPolicy};

use super::RouteStopIndex;

/// Route stop listings fetched at once while building the index.
pub const DEFAULT_FAN_OUT_CONCURRENCY: usize = 3;

/// Lifecycle of the index. There is no way back from `Built`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Unstarted,
    Building,
    Built,
}

/// Fetch every route's stop listing and merge them into one index.
///
/// Each listing is fetched with `retry`, at most `concurrency` at a time. A
/// route contributes all of its stops or, if its task never succeeds, none.
pub async fn build_route_stop_index(
    api: Arc<dyn TransitApi>,
    routes: &[Route],
    concurrency: usize,
    retry: RetryPolicy,
) -> RouteStopIndex {
    let tasks: Vec<_> = routes
        .iter()
        .map(|route| {
            let api = Arc::clone(&api);
            let route_id = route.id.clone();
            move || async move {
                let (api, id) = (&api, &route_id);
                let listing = with_retry(&retry, move || api.fetch_route_stops(id)).await?;
                Ok::<_, ApiError>((route_id, listing))
            }
        })
        .collect();

    let results = run_with_concurrency(tasks, concurrency).await;

    let mut index = RouteStopIndex::new();
    let mut merged = 0usize;
    for (route_id, listing) in results.into_iter().flatten() {
        index.merge_route(&route_id, &listing);
        merged += 1;
    }
    debug!(routes = routes.len(), merged, stops = index.len(), "Route stop listings merged");
    index
}

/// Owner of the shared route-stop index.
///
/// The first `get` starts the build; every later caller, concurrent or not,
/// shares that one build and then its result. Fetches inside the build retry
/// without limit, so the build itself cannot fail.
pub struct RouteStopIndexer {
    slot: SingleFlight<Arc<RouteStopIndex>, Infallible>,
    concurrency: usize,
    retry: RetryPolicy,
}

impl RouteStopIndexer {
    pub fn new(concurrency: usize, retry: RetryPolicy) -> Self {
        Self {
            slot: SingleFlight::new("route_stop_index"),
            concurrency,
            retry,
        }
    }

    pub fn state(&self) -> IndexState {
        if self.slot.peek().is_some() {
            IndexState::Built
        } else if self.slot.is_started() {
            IndexState::Building
        } else {
            IndexState::Unstarted
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state() == IndexState::Building
    }

    /// The built index, without waiting.
    pub fn peek(&self) -> Option<Arc<RouteStopIndex>> {
        self.slot.peek()
    }

    /// The shared build, started on first call.
    ///
    /// `load_routes` supplies the route list; it is retried with the same
    /// policy as the per-route fetches.
    pub fn get<L, LFut, E>(&self, api: Arc<dyn TransitApi>, load_routes: L) -> Pending<Arc<RouteStopIndex>, Infallible>
    where
        L: Fn() -> LFut + Send + Sync + 'static,
        LFut: Future<Output = Result<Arc<Vec<Route>>, E>> + Send,
        E: Display + Send,
    {
        let concurrency = self.concurrency;
        let retry = self.retry;
        self.slot.get(move || async move {
            info!(concurrency, "Building route-stop index");
            let routes = with_retry(&retry, &load_routes).await.unwrap_or_else(|e| {
                // Only reachable with a bounded policy
                debug!(error = %e, "Route list unavailable, index left empty");
                Arc::new(Vec::new())
            });
            let index = build_route_stop_index(api, &routes, concurrency, retry).await;
            info!(routes = routes.len(), stops = index.len(), "Route-stop index built");
            Ok::<_, Infallible>(Arc::new(index))
        })
    }

    /// Start the build on the current tokio runtime without waiting for it.
    pub fn spawn_build<L, LFut, E>(&self, api: Arc<dyn TransitApi>, load_routes: L)
    where
        L: Fn() -> LFut + Send + Sync + 'static,
        LFut: Future<Output = Result<Arc<Vec<Route>>, E>> + Send,
        E: Display + Send,
    {
        if self.state() == IndexState::Built {
            return;
        }
        let build = self.get(api, load_routes);
        tokio::spawn(async move {
            let _ = build.await;
        });
    }

    /// Await the shared build.
    pub async fn wait<L, LFut, E>(&self, api: Arc<dyn TransitApi>, load_routes: L) -> Arc<RouteStopIndex>
    where
        L: Fn() -> LFut + Send + Sync + 'static,
        LFut: Future<Output = Result<Arc<Vec<Route>>, E>> + Send,
        E: Display + Send,
    {
        match self.get(api, load_routes).await {
            Ok(index) => index,
            Err(never) => match never {},
        }
    }
}
