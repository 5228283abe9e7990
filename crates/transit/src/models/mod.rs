//! Catalog data models, types, and traits.

pub mod time;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use time::TimeLabel;
pub use traits::RouteDataset;
pub use types::{
    PositionBase, Result, Route, RouteCategory, RouteDetails, RouteSummary, Stop,
    StoreOperation, TransitError, TransportError,
};
