//! Core data types and enums for the route catalog.

use strum::Display;

use crate::identifiers::*;
use crate::models::time::TimeLabel;

// ============================================================================
// Enums
// ============================================================================

/// Service category of a route
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum RouteCategory {
    Express,
    Regular,
}

impl RouteCategory {
    pub fn from_code(value: &str) -> Option<Self> {
        match value {
            "express" => Some(Self::Express),
            "regular" => Some(Self::Regular),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Express => "express",
            Self::Regular => "regular",
        }
    }
}

/// Whether stop positions start counting at zero or one.
///
/// The remote store does not validate positions; this only has to agree
/// with whatever convention the deployment's store uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PositionBase {
    Zero,
    #[default]
    One,
}

impl PositionBase {
    pub fn position_of(&self, index: usize) -> u32 {
        match self {
            Self::Zero => index as u32,
            Self::One => index as u32 + 1,
        }
    }

    pub fn from_offset(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Zero),
            1 => Some(Self::One),
            _ => None,
        }
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A route as listed by the catalog (no stops)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub id: RouteId,
    pub number: RouteNumber,
    pub name: String,
    /// Display color, e.g. "#0EA5E9"
    pub color: String,
    pub category: RouteCategory,
    /// Stop count summary, only present in listings
    pub stop_count: Option<u32>,
    /// Duration summary, only present in listings
    pub duration: Option<String>,
}

/// A single waypoint on a route
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    /// Free-form time label; `None` and `Some("")` are both "no time"
    pub time: Option<String>,
    pub position: u32,
}

impl Stop {
    pub fn time_label(&self) -> TimeLabel {
        TimeLabel::parse(self.time.as_deref().unwrap_or_default())
    }
}

/// A route with its ordered stops.
///
/// Index 0 is the origin, the last index is the terminus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteDetails {
    pub route: Route,
    pub stops: Vec<Stop>,
}

/// Display summary derived from a route's stop list
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteSummary {
    pub stop_count: usize,
    /// Time label of the terminus
    pub duration: Option<String>,
}

impl RouteDetails {
    pub fn number(&self) -> &RouteNumber {
        &self.route.number
    }

    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            stop_count: self.stops.len(),
            duration: self
                .stops
                .last()
                .and_then(|stop| stop.time.clone())
                .filter(|time| !time.is_empty()),
        }
    }

    /// The listing form of this route, with summaries filled in
    pub fn to_listing(&self) -> Route {
        let summary = self.summary();
        Route {
            stop_count: Some(summary.stop_count as u32),
            duration: summary.duration,
            ..self.route.clone()
        }
    }

    pub fn stop(&self, id: StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| stop.id == id)
    }
}

// ============================================================================
// Errors
// ============================================================================

/// The remote call a transport failure belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum StoreOperation {
    #[strum(to_string = "list routes")]
    ListRoutes,
    #[strum(to_string = "fetch route details")]
    GetRouteDetails,
    #[strum(to_string = "update route")]
    UpdateRouteName,
    #[strum(to_string = "create stop")]
    CreateStop,
    #[strum(to_string = "update stop")]
    UpdateStop,
}

/// Any non-success response or network failure from the remote store.
///
/// Remote failures are treated uniformly; the value only records which call
/// failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Failed to {operation}")]
pub struct TransportError {
    pub operation: StoreOperation,
}

impl TransportError {
    pub fn new(operation: StoreOperation) -> Self {
        Self { operation }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, TransitError>;
