//! In-memory route dataset used when the remote store is unreachable.
//!
//! The dataset is versioned and injected by whoever builds the loader, so it
//! can be replaced or extended without touching loading logic. A bundled
//! dataset with the city's core routes ships with the crate.

use std::collections::HashMap;
use std::sync::Arc;

use crate::identifiers::*;
use crate::models::{traits::*, types::*};

// ============================================================================
// Dataset Entries
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct StaticStop {
    /// Defaults to the stop's one-based index
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<i64>,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub time: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct StaticRoute {
    pub number: String,
    pub name: String,
    pub color: String,
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub category: String,
    pub stops: Vec<StaticStop>,
}

impl StaticRoute {
    /// Synthesize remote-shaped details. The route id is the numeric route
    /// number; stop positions are one-based.
    fn to_details(&self) -> Result<RouteDetails> {
        let number = RouteNumber::new(&self.number);
        let id = number.numeric().ok_or_else(|| {
            TransitError::InvalidData(format!("route number {:?} is not numeric", self.number))
        })?;
        let category = RouteCategory::from_code(&self.category).ok_or_else(|| {
            TransitError::InvalidData(format!(
                "route {} has unknown type {:?}",
                self.number, self.category
            ))
        })?;

        let stops = self
            .stops
            .iter()
            .enumerate()
            .map(|(index, stop)| Stop {
                id: StopId::Remote(stop.id.unwrap_or(index as i64 + 1)),
                name: stop.name.clone(),
                time: stop.time.clone(),
                position: PositionBase::One.position_of(index),
            })
            .collect();

        Ok(RouteDetails {
            route: Route {
                id: RouteId(id),
                number,
                name: self.name.clone(),
                color: self.color.clone(),
                category,
                stop_count: None,
                duration: None,
            },
            stops,
        })
    }
}

// ============================================================================
// Static Dataset
// ============================================================================

/// Read-only route dataset held in memory
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone, Debug)]
pub struct StaticRouteDataset {
    version: Arc<str>,
    routes: Vec<Arc<RouteDetails>>,

    // Lookup map
    route_map: HashMap<RouteNumber, Arc<RouteDetails>>,
}

impl StaticRouteDataset {
    /// Create a new empty dataset
    pub fn new(version: impl AsRef<str>) -> Self {
        Self {
            version: version.as_ref().into(),
            routes: Vec::new(),
            route_map: HashMap::new(),
        }
    }

    /// Build a dataset from raw entries, validating every route
    pub fn from_data(version: impl AsRef<str>, routes: Vec<StaticRoute>) -> Result<Self> {
        let mut details = routes
            .iter()
            .map(StaticRoute::to_details)
            .collect::<Result<Vec<_>>>()?;
        details.sort_by_key(|route| route.route.id);

        let routes: Vec<Arc<RouteDetails>> = details.into_iter().map(Arc::new).collect();

        // Build lookup map
        let mut route_map = HashMap::with_capacity(routes.len());
        for route in &routes {
            if route_map.insert(route.number().clone(), route.clone()).is_some() {
                return Err(TransitError::InvalidData(format!(
                    "route {} appears more than once",
                    route.number()
                )));
            }
        }

        Ok(Self {
            version: version.as_ref().into(),
            routes,
            route_map,
        })
    }

    /// Load a dataset document: `{ "version": "...", "routes": [...] }`
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(serde::Deserialize)]
        struct Document {
            version: String,
            routes: Vec<StaticRoute>,
        }

        let document: Document = serde_json::from_str(json)
            .map_err(|e| TransitError::SerializationError(e.to_string()))?;
        Self::from_data(document.version, document.routes)
    }

    /// The dataset bundled with this crate
    pub fn bundled() -> Self {
        let routes = BUNDLED_ROUTES
            .iter()
            .map(|(number, name, color, category, stops)| StaticRoute {
                number: (*number).into(),
                name: (*name).into(),
                color: (*color).into(),
                category: (*category).into(),
                stops: stops
                    .iter()
                    .map(|(name, time)| StaticStop {
                        id: None,
                        name: (*name).into(),
                        time: Some((*time).into()),
                    })
                    .collect(),
            })
            .collect();

        // Bundled entries are checked by test_bundled_dataset
        Self::from_data(BUNDLED_VERSION, routes).unwrap_or_else(|_| Self::new(BUNDLED_VERSION))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for StaticRouteDataset {
    fn default() -> Self {
        Self::bundled()
    }
}

impl RouteDataset for StaticRouteDataset {
    fn version(&self) -> &str {
        &self.version
    }

    fn route_details(&self, number: &RouteNumber) -> Option<RouteDetails> {
        self.route_map.get(number).map(|route| RouteDetails::clone(route))
    }

    fn contains(&self, number: &RouteNumber) -> bool {
        self.route_map.contains_key(number)
    }

    fn all_routes(&self) -> Vec<Route> {
        self.routes.iter().map(|route| route.to_listing()).collect()
    }
}

// ============================================================================
// Bundled Data
// ============================================================================

pub const BUNDLED_VERSION: &str = "bundled-2024.1";

type BundledRoute = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str)],
);

const BUNDLED_ROUTES: &[BundledRoute] = &[
    (
        "1",
        "Центр — Жовтневый",
        "#0EA5E9",
        "regular",
        &[
            ("Площадь Героев", "Начало"),
            ("Улица Оборонная", "3 мин"),
            ("Проспект Ленина", "7 мин"),
            ("ЦУМ", "12 мин"),
            ("Театр", "15 мин"),
            ("Парк Горького", "20 мин"),
            ("Улица Советская", "25 мин"),
            ("Жовтневый район", "45 мин"),
        ],
    ),
    (
        "5",
        "Вокзал — Острая Могила",
        "#10B981",
        "express",
        &[
            ("Автовокзал", "Начало"),
            ("Улица Титова", "4 мин"),
            ("Центральный рынок", "10 мин"),
            ("Проспект Победы", "18 мин"),
            ("Острая Могила", "35 мин"),
        ],
    ),
    (
        "12",
        "ЦУМ — Артёмовский",
        "#F59E0B",
        "regular",
        &[
            ("ЦУМ", "Начало"),
            ("Улица Коцюбинского", "5 мин"),
            ("Парк Дружбы", "12 мин"),
            ("Университет", "18 мин"),
            ("Артёмовский район", "40 мин"),
        ],
    ),
];
