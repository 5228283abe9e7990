//! Core traits for catalog data.
//!
//! These traits define the read-only interface for route data that is
//! available without the remote store. Implementations can be bundled,
//! file-backed, or cached from a previous session.

use crate::identifiers::*;
use crate::models::types::*;

// ============================================================================
// Dataset Trait
// ============================================================================

/// A read-only set of route details used when the remote store is unreachable
pub trait RouteDataset: Send + Sync {
    /// Version tag of the dataset, shown to users when data is served from it
    fn version(&self) -> &str;

    // ---- Lookups ----
    fn route_details(&self, number: &RouteNumber) -> Option<RouteDetails>;

    fn contains(&self, number: &RouteNumber) -> bool {
        self.route_details(number).is_some()
    }

    // ---- Collections ----

    /// Listing form of every route, ordered by route number
    fn all_routes(&self) -> Vec<Route>;
}
