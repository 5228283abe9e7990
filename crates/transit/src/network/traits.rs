//! Pluggable remote store traits.
//!
//! External crates implement these to reach the remote route store. No
//! retries happen at this layer: every call is attempted once and any
//! failure comes back as a [`TransportError`].

use std::future::Future;
use std::pin::Pin;

use crate::identifiers::*;
use crate::models::types::{Route, RouteDetails, Stop, TransportError};

/// A stop to be created by the remote store, which assigns its identifier
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewStop {
    pub route_id: i64,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub time: String,
    pub position: u32,
}

/// Any subset of a stop's mutable fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StopPatch {
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub name: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub time: Option<String>,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub position: Option<u32>,
}

impl StopPatch {
    /// Patch setting every field to the values of `stop`
    pub fn full(stop: &Stop) -> Self {
        Self {
            name: Some(stop.name.clone()),
            time: Some(stop.time.clone().unwrap_or_default()),
            position: Some(stop.position),
        }
    }

    /// Patch with only the fields that differ between `before` and `after`
    pub fn between(before: &Stop, after: &Stop) -> Self {
        Self {
            name: (before.name != after.name).then(|| after.name.clone()),
            time: (before.time.as_deref().unwrap_or_default()
                != after.time.as_deref().unwrap_or_default())
            .then(|| after.time.clone().unwrap_or_default()),
            position: (before.position != after.position).then_some(after.position),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.time.is_none() && self.position.is_none()
    }
}

/// Typed access to the remote Routes and Stops resources
pub trait RouteStore: Send + Sync {
    /// All routes, without stops
    fn list_routes<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Route>, TransportError>> + Send + 'a>>;

    /// One route with its ordered stops. "Not found" is a transport failure.
    fn get_route_details<'a>(
        &'a self,
        number: &'a RouteNumber,
    ) -> Pin<Box<dyn Future<Output = Result<RouteDetails, TransportError>> + Send + 'a>>;

    /// Replace a route's display name. Repeating the call has no further effect.
    fn update_route_name<'a>(
        &'a self,
        number: &'a RouteNumber,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;

    /// Create a stop; the returned stop carries the server-issued identifier
    fn create_stop<'a>(
        &'a self,
        stop: &'a NewStop,
    ) -> Pin<Box<dyn Future<Output = Result<Stop, TransportError>> + Send + 'a>>;

    /// Update any subset of a stop's fields
    fn update_stop<'a>(
        &'a self,
        id: i64,
        patch: &'a StopPatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(name: &str, time: Option<&str>, position: u32) -> Stop {
        Stop {
            id: StopId::Remote(7),
            name: name.into(),
            time: time.map(Into::into),
            position,
        }
    }

    #[test]
    fn test_patch_between_only_changed_fields() {
        let before = stop("ЦУМ", Some("12 мин"), 4);
        let after = stop("ЦУМ", Some("13 мин"), 4);

        let patch = StopPatch::between(&before, &after);
        assert_eq!(patch.name, None);
        assert_eq!(patch.time.as_deref(), Some("13 мин"));
        assert_eq!(patch.position, None);
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_patch_treats_missing_time_as_empty() {
        let before = stop("Театр", None, 5);
        let after = stop("Театр", Some(""), 5);
        assert!(StopPatch::between(&before, &after).is_empty());
    }

    #[test]
    fn test_full_patch() {
        let patch = StopPatch::full(&stop("Театр", None, 5));
        assert_eq!(patch.name.as_deref(), Some("Театр"));
        assert_eq!(patch.time.as_deref(), Some(""));
        assert_eq!(patch.position, Some(5));
    }
}
