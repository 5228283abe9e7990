//! Route listing and search.

use std::sync::Arc;

use busline_transit::prelude::*;
use itertools::Itertools;
use tracing::{info, warn};

use crate::loader::DataSource;

/// Routes in listing form, with where they came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteListing {
    pub routes: Vec<Route>,
    pub source: DataSource,
}

pub struct RouteCatalog<S> {
    store: Arc<S>,
    dataset: Arc<dyn RouteDataset>,
}

impl<S: RouteStore> RouteCatalog<S> {
    pub fn new(store: Arc<S>, dataset: Arc<dyn RouteDataset>) -> Self {
        Self { store, dataset }
    }

    /// All routes from the remote store, or the fallback dataset's routes if
    /// the store cannot be reached
    pub async fn list(&self) -> RouteListing {
        match self.store.list_routes().await {
            Ok(routes) => {
                info!(routes = routes.len(), "route listing loaded");
                RouteListing {
                    routes,
                    source: DataSource::Remote,
                }
            }
            Err(error) => {
                warn!(
                    %error,
                    version = self.dataset.version(),
                    "listing routes from fallback dataset"
                );
                RouteListing {
                    routes: self.dataset.all_routes(),
                    source: DataSource::Fallback {
                        version: self.dataset.version().to_owned(),
                    },
                }
            }
        }
    }

    /// Routes matching `query` by number, name or stop name. Exact number
    /// matches come first; an empty query matches everything.
    pub async fn search(&self, query: &str) -> RouteListing {
        let listing = self.list().await;
        let routes = filter_routes(&listing.routes, query, |number| match listing.source {
            DataSource::Fallback { .. } => self.dataset.route_details(number),
            DataSource::Remote => None,
        });
        RouteListing {
            routes,
            source: listing.source,
        }
    }
}

/// Stop names are only searched for routes whose details `details` returns
pub fn filter_routes(
    routes: &[Route],
    query: &str,
    details: impl Fn(&RouteNumber) -> Option<RouteDetails>,
) -> Vec<Route> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return routes.to_vec();
    }

    let contains = |text: &str| text.to_lowercase().contains(&query);
    routes
        .iter()
        .filter(|route| {
            contains(route.number.as_str())
                || contains(&route.name)
                || details(&route.number)
                    .is_some_and(|details| details.stops.iter().any(|stop| contains(&stop.name)))
        })
        .sorted_by_key(|route| route.number.as_str().to_lowercase() != query)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRouteStore;

    fn bundled() -> Arc<StaticRouteDataset> {
        Arc::new(StaticRouteDataset::bundled())
    }

    fn numbers(listing: &RouteListing) -> Vec<&str> {
        listing.routes.iter().map(|route| route.number.as_str()).collect()
    }

    fn remote_catalog() -> RouteCatalog<MemoryRouteStore> {
        let dataset = bundled();
        let routes = dataset
            .all_routes()
            .iter()
            .filter_map(|route| dataset.route_details(&route.number))
            .collect();
        RouteCatalog::new(Arc::new(MemoryRouteStore::new(routes)), dataset)
    }

    #[tokio::test]
    async fn test_remote_listing_has_summaries() {
        let listing = remote_catalog().list().await;
        assert_eq!(listing.source, DataSource::Remote);
        assert_eq!(numbers(&listing), ["1", "5", "12"]);
        assert_eq!(listing.routes[0].stop_count, Some(8));
        assert_eq!(listing.routes[0].duration.as_deref(), Some("45 мин"));
    }

    #[tokio::test]
    async fn test_listing_falls_back() {
        let store = Arc::new(MemoryRouteStore::default());
        store.fail(StoreOperation::ListRoutes);
        let catalog = RouteCatalog::new(store, bundled());

        let listing = catalog.list().await;
        assert_eq!(
            listing.source,
            DataSource::Fallback {
                version: busline_transit::provider::BUNDLED_VERSION.to_owned()
            }
        );
        assert_eq!(numbers(&listing), ["1", "5", "12"]);
    }

    #[tokio::test]
    async fn test_search_by_name_and_number() {
        let catalog = remote_catalog();
        assert_eq!(numbers(&catalog.search("вокзал").await), ["5"]);
        assert_eq!(numbers(&catalog.search("  ").await), ["1", "5", "12"]);

        // "1" is contained in "12" but the exact match ranks first
        assert_eq!(numbers(&catalog.search("1").await), ["1", "12"]);
        assert_eq!(numbers(&catalog.search("12").await), ["12"]);
    }

    #[tokio::test]
    async fn test_search_by_stop_name_needs_known_stops() {
        // Remote listings carry no stops
        assert!(remote_catalog().search("Театр").await.routes.is_empty());

        let store = Arc::new(MemoryRouteStore::default());
        store.fail_all();
        let catalog = RouteCatalog::new(store, bundled());
        assert_eq!(numbers(&catalog.search("цум").await), ["1", "12"]);
    }

    #[test]
    fn test_exact_number_ranks_first() {
        let dataset = StaticRouteDataset::bundled();
        let routes = dataset.all_routes();
        let found = filter_routes(&routes, "12", |number| dataset.route_details(number));
        assert_eq!(found[0].number.as_str(), "12");
    }
}
