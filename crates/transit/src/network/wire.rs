//! JSON records exchanged with the remote store.
//!
//! Field names follow the remote resources: a route's category travels as
//! `type`, and `stops` is a count in listings but the full stop list in
//! route details.

use serde::{Deserialize, Serialize};

use crate::identifiers::*;
use crate::models::types::*;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRecord {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stops: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopRecord {
    pub id: StopId,
    pub name: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub position: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDetailsRecord {
    pub id: i64,
    pub number: String,
    pub name: String,
    pub color: String,
    #[serde(rename = "type")]
    pub category: String,
    #[serde(default)]
    pub stops: Vec<StopRecord>,
}

/// Body of `PUT /routes?number=`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNameUpdate {
    pub name: String,
}

fn parse_category(value: &str) -> Result<RouteCategory> {
    RouteCategory::from_code(value)
        .ok_or_else(|| TransitError::InvalidData(format!("unknown route type {value:?}")))
}

impl TryFrom<RouteRecord> for Route {
    type Error = TransitError;

    fn try_from(record: RouteRecord) -> Result<Self> {
        Ok(Route {
            id: RouteId(record.id),
            number: RouteNumber::from(record.number),
            name: record.name,
            color: record.color,
            category: parse_category(&record.category)?,
            stop_count: record.stops,
            duration: record.duration,
        })
    }
}

impl From<&Route> for RouteRecord {
    fn from(route: &Route) -> Self {
        RouteRecord {
            id: route.id.0,
            number: route.number.to_string(),
            name: route.name.clone(),
            color: route.color.clone(),
            category: route.category.code().to_owned(),
            stops: route.stop_count,
            duration: route.duration.clone(),
        }
    }
}

impl From<StopRecord> for Stop {
    fn from(record: StopRecord) -> Self {
        Stop {
            id: record.id,
            name: record.name,
            time: record.time,
            position: record.position,
        }
    }
}

impl From<&Stop> for StopRecord {
    fn from(stop: &Stop) -> Self {
        StopRecord {
            id: stop.id,
            name: stop.name.clone(),
            time: stop.time.clone(),
            position: stop.position,
        }
    }
}

impl TryFrom<RouteDetailsRecord> for RouteDetails {
    type Error = TransitError;

    fn try_from(record: RouteDetailsRecord) -> Result<Self> {
        Ok(RouteDetails {
            route: Route {
                id: RouteId(record.id),
                number: RouteNumber::from(record.number),
                name: record.name,
                color: record.color,
                category: parse_category(&record.category)?,
                stop_count: None,
                duration: None,
            },
            stops: record.stops.into_iter().map(Stop::from).collect(),
        })
    }
}

impl From<&RouteDetails> for RouteDetailsRecord {
    fn from(details: &RouteDetails) -> Self {
        let route = &details.route;
        RouteDetailsRecord {
            id: route.id.0,
            number: route.number.to_string(),
            name: route.name.clone(),
            color: route.color.clone(),
            category: route.category.code().to_owned(),
            stops: details.stops.iter().map(StopRecord::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_listing_from_json() {
        let json = r##"[
            {"id": 1, "number": "1", "name": "Центр — Жовтневый", "color": "#0EA5E9",
             "type": "regular", "stops": 8, "duration": "45 мин"},
            {"id": 2, "number": "5", "name": "Вокзал — Острая Могила", "color": "#10B981",
             "type": "express"}
        ]"##;

        let records: Vec<RouteRecord> = serde_json::from_str(json).unwrap();
        let routes: Vec<Route> = records
            .into_iter()
            .map(Route::try_from)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(routes[0].stop_count, Some(8));
        assert_eq!(routes[0].duration.as_deref(), Some("45 мин"));
        assert_eq!(routes[1].category, RouteCategory::Express);
        assert_eq!(routes[1].stop_count, None);
    }

    #[test]
    fn test_route_details_from_json() {
        let json = r##"{
            "id": 3, "number": "12", "name": "ЦУМ — Артёмовский", "color": "#F59E0B",
            "type": "regular",
            "stops": [
                {"id": 31, "name": "ЦУМ", "time": "Начало", "position": 1},
                {"id": 32, "name": "Улица Коцюбинского", "time": null, "position": 2}
            ]
        }"##;

        let record: RouteDetailsRecord = serde_json::from_str(json).unwrap();
        let details = RouteDetails::try_from(record).unwrap();

        assert_eq!(details.route.number, RouteNumber::new("12"));
        assert_eq!(details.stops.len(), 2);
        assert_eq!(details.stops[0].id, StopId::Remote(31));
        assert_eq!(details.stops[1].time, None);
    }

    #[test]
    fn test_unknown_route_type_is_invalid() {
        let record = RouteRecord {
            id: 1,
            number: "1".into(),
            name: "x".into(),
            color: "#000".into(),
            category: "night".into(),
            stops: None,
            duration: None,
        };
        assert!(matches!(Route::try_from(record), Err(TransitError::InvalidData(_))));
    }

    #[test]
    fn test_local_stop_cannot_be_serialized() {
        let record = StopRecord {
            id: StopId::Local(1),
            name: "Новая остановка".into(),
            time: None,
            position: 9,
        };
        assert!(serde_json::to_string(&record).is_err());
    }

    #[test]
    fn test_stop_patch_omits_unset_fields() {
        use crate::network::StopPatch;

        let patch = StopPatch {
            time: Some("7 мин".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"time":"7 мин"}"#);
    }
}
