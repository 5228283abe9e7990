//! Remote route store clients.

pub mod http;
pub mod memory;

pub use http::HttpRouteStore;
pub use memory::{MemoryRouteStore, StoreCall};
