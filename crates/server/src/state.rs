use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use busline_transit::prelude::*;

/// A request the server received, in arrival order
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Default)]
struct Inner {
    routes: Vec<RouteDetails>,
    next_stop_id: i64,
    outage: bool,
    requests: Vec<RecordedRequest>,
}

/// Shared state behind the router
///
/// This type is cheap to clone; clones see the same routes.
#[derive(Clone, Default)]
pub struct ServerState {
    inner: Arc<Mutex<Inner>>,
}

impl ServerState {
    /// Serve `routes` as given
    pub fn new(routes: Vec<RouteDetails>) -> Self {
        let next_stop_id = routes
            .iter()
            .flat_map(|route| route.stops.iter())
            .filter_map(|stop| stop.id.remote())
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            inner: Arc::new(Mutex::new(Inner {
                routes,
                next_stop_id,
                ..Default::default()
            })),
        }
    }

    /// Serve every route of `dataset`, with stop ids renumbered so they are
    /// unique across routes
    pub fn seeded(dataset: &dyn RouteDataset) -> Self {
        let mut next_id = 0;
        let routes = dataset
            .all_routes()
            .iter()
            .filter_map(|route| dataset.route_details(&route.number))
            .map(|mut details| {
                for stop in &mut details.stops {
                    next_id += 1;
                    stop.id = StopId::Remote(next_id);
                }
                details
            })
            .collect();
        Self::new(routes)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// While in an outage every request is answered with 503
    pub fn set_outage(&self, outage: bool) {
        self.lock().outage = outage;
    }

    pub fn in_outage(&self) -> bool {
        self.lock().outage
    }

    pub fn record(&self, request: RecordedRequest) {
        self.lock().requests.push(request);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests with `method` to `path`
    pub fn count(&self, method: &str, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub fn route(&self, number: &RouteNumber) -> Option<RouteDetails> {
        self.lock()
            .routes
            .iter()
            .find(|route| route.number() == number)
            .cloned()
    }

    /// Listing form of every route, ordered by numeric route number
    pub fn listing(&self) -> Vec<Route> {
        let mut routes: Vec<Route> = self
            .lock()
            .routes
            .iter()
            .map(RouteDetails::to_listing)
            .collect();
        routes.sort_by_key(|route| route.number.numeric());
        routes
    }

    /// Returns `false` if the route is unknown
    pub fn rename_route(&self, number: &RouteNumber, name: &str) -> bool {
        let mut inner = self.lock();
        match inner.routes.iter_mut().find(|route| route.number() == number) {
            Some(route) => {
                route.route.name = name.to_owned();
                true
            }
            None => false,
        }
    }

    /// Returns `None` if no route has `stop.route_id`
    pub fn create_stop(&self, stop: &NewStop) -> Option<Stop> {
        let mut inner = self.lock();
        let id = inner.next_stop_id;
        let route = inner
            .routes
            .iter_mut()
            .find(|route| route.route.id.0 == stop.route_id)?;

        let created = Stop {
            id: StopId::Remote(id),
            name: stop.name.clone(),
            time: Some(stop.time.clone()),
            position: stop.position,
        };
        route.stops.push(created.clone());
        route.stops.sort_by_key(|stop| stop.position);
        inner.next_stop_id += 1;
        Some(created)
    }

    /// Returns `false` if the stop is unknown or the patch is empty
    pub fn update_stop(&self, id: i64, patch: &StopPatch) -> bool {
        if patch.is_empty() {
            return false;
        }

        let mut inner = self.lock();
        let Some(route) = inner
            .routes
            .iter_mut()
            .find(|route| route.stop(StopId::Remote(id)).is_some())
        else {
            return false;
        };

        if let Some(stop) = route.stops.iter_mut().find(|stop| stop.id == StopId::Remote(id)) {
            if let Some(name) = &patch.name {
                stop.name = name.clone();
            }
            if let Some(time) = &patch.time {
                stop.time = Some(time.clone());
            }
            if let Some(position) = patch.position {
                stop.position = position;
            }
        }
        route.stops.sort_by_key(|stop| stop.position);
        true
    }
}
