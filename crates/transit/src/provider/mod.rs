//! Route data providers.

pub mod static_provider;

pub use static_provider::{StaticRoute, StaticRouteDataset, StaticStop, BUNDLED_VERSION};
