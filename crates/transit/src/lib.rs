//! # busline-transit
//!
//! Data model for a city bus route catalog.
//!
//! ## Features
//!
//! - **Typed identifiers**: route numbers, remote ids, and local/remote stop ids
//! - **Route details**: ordered stop lists with display summaries
//! - **Fallback data**: versioned, injectable datasets used when the remote store is down
//! - **Pluggable networking**: implement [`RouteStore`] to reach your remote store
//! - **Wire records**: JSON shapes of the remote resources (`serde` feature)
//!
//! ## Example
//!
//! ```
//! use busline_transit::prelude::*;
//!
//! let dataset = StaticRouteDataset::bundled();
//!
//! let route = dataset.route_details(&RouteNumber::new("5")).unwrap();
//! assert_eq!(route.route.category, RouteCategory::Express);
//! assert_eq!(route.summary().duration.as_deref(), Some("35 мин"));
//! ```

pub mod identifiers;
pub mod models;
pub mod network;
pub mod provider;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::time::*;
    pub use crate::models::traits::*;
    pub use crate::models::types::{
        PositionBase, Route, RouteCategory, RouteDetails, RouteSummary, Stop, StoreOperation,
        TransitError, TransportError,
    };
    pub use crate::network::traits::*;
    pub use crate::provider::static_provider::{StaticRoute, StaticRouteDataset, StaticStop};
}

pub use prelude::*;
