pub mod catalog;
pub mod config;
pub mod editor;
pub mod loader;
pub mod session;
pub mod store;

// Re-export transit from the transit crate
pub use busline_transit as transit;

pub use catalog::{RouteCatalog, RouteListing};
pub use config::{ConfigError, SessionConfig, StoreConfig};
pub use editor::{EditorError, SavePolicy};
pub use loader::{DataSource, LoadState, RouteDetailLoader};
pub use session::{Notification, RouteSession, RouteView};
pub use store::{HttpRouteStore, MemoryRouteStore};
