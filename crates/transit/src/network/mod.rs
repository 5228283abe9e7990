//! Remote store abstractions and wire formats.

pub mod traits;
#[cfg(feature = "serde")]
pub mod wire;

pub use traits::{NewStop, RouteStore, StopPatch};
