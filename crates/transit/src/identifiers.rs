//! Type-safe identifiers for catalog entities.
//!
//! Route numbers use Arc<str> for cheap cloning. Remote-issued ids are plain
//! integers; stop ids distinguish client-generated ids from server-issued ones.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

macro_rules! impl_identifier {
    ($name:ident) => {
        #[derive(Clone, Debug)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

impl_identifier!(RouteNumber);

impl RouteNumber {
    /// Numeric value of the route number, if it is purely numeric.
    ///
    /// Used to order listings ("2" before "10") and to derive identifiers
    /// for fallback routes.
    pub fn numeric(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }
}

/// Identifier issued by the remote store for a route
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub i64);

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stop within its route.
///
/// `Local` ids are generated by the client for stops that the remote store
/// has not seen yet. They never collide with `Remote` ids and are replaced
/// once the store creates the stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopId {
    Local(u64),
    Remote(i64),
}

impl StopId {
    pub fn is_local(&self) -> bool {
        matches!(self, StopId::Local(_))
    }

    pub fn remote(&self) -> Option<i64> {
        match self {
            StopId::Remote(id) => Some(*id),
            StopId::Local(_) => None,
        }
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopId::Local(n) => write!(f, "new-{n}"),
            StopId::Remote(id) => write!(f, "{id}"),
        }
    }
}

impl std::str::FromStr for StopId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("new-") {
            Some(local) => local.parse().map(StopId::Local),
            None => s.parse().map(StopId::Remote),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for StopId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StopId::Remote(id) => serializer.serialize_i64(*id),
            StopId::Local(n) => Err(serde::ser::Error::custom(format!(
                "stop new-{n} has no remote identifier yet"
            ))),
        }
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for StopId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <i64 as serde::Deserialize>::deserialize(deserializer).map(StopId::Remote)
    }
}
