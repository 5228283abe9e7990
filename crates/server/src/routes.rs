use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use busline_transit::network::wire::{RouteDetailsRecord, RouteRecord, StopRecord};
use busline_transit::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::debug;

use crate::state::{RecordedRequest, ServerState};

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/routes", get(get_routes).put(put_route))
        .route("/stops", post(post_stop).put(put_stop))
        .route("/health", get(health))
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn message(message: &str) -> Response {
    (StatusCode::OK, Json(json!({ "message": message }))).into_response()
}

async fn record_request(
    State(state): State<ServerState>,
    request: Request,
    next: Next,
) -> Response {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_owned(),
        query: request.uri().query().map(str::to_owned),
    };
    debug!(method = %recorded.method, path = %recorded.path, query = ?recorded.query, "request");
    state.record(recorded);

    if state.in_outage() {
        return error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable");
    }
    next.run(request).await
}

#[derive(Deserialize)]
struct RouteQuery {
    number: Option<String>,
}

async fn get_routes(
    State(state): State<ServerState>,
    Query(query): Query<RouteQuery>,
) -> Response {
    match query.number.filter(|number| !number.is_empty()) {
        Some(number) => match state.route(&RouteNumber::new(number)) {
            Some(details) => Json(RouteDetailsRecord::from(&details)).into_response(),
            None => error(StatusCode::NOT_FOUND, "Route not found"),
        },
        None => {
            let routes: Vec<RouteRecord> =
                state.listing().iter().map(RouteRecord::from).collect();
            Json(routes).into_response()
        }
    }
}

#[derive(Deserialize)]
struct RouteUpdate {
    name: Option<String>,
}

async fn put_route(
    State(state): State<ServerState>,
    Query(query): Query<RouteQuery>,
    Json(body): Json<RouteUpdate>,
) -> Response {
    let Some(number) = query.number.filter(|number| !number.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "Route number is required");
    };
    let number = RouteNumber::new(number);

    let found = match body.name {
        Some(name) => state.rename_route(&number, &name),
        None => state.route(&number).is_some(),
    };
    if found {
        message("Route updated successfully")
    } else {
        error(StatusCode::NOT_FOUND, "Route not found")
    }
}

#[derive(Deserialize)]
struct StopCreate {
    route_id: Option<i64>,
    name: Option<String>,
    #[serde(default)]
    time: String,
    position: Option<u32>,
}

#[derive(Serialize)]
struct CreatedStop {
    route_id: i64,
    #[serde(flatten)]
    stop: StopRecord,
}

async fn post_stop(State(state): State<ServerState>, Json(body): Json<StopCreate>) -> Response {
    let (Some(route_id), Some(name), Some(position)) = (
        body.route_id.filter(|id| *id != 0),
        body.name.filter(|name| !name.is_empty()),
        body.position,
    ) else {
        return error(StatusCode::BAD_REQUEST, "Missing required fields");
    };

    let new = NewStop {
        route_id,
        name,
        time: body.time,
        position,
    };
    match state.create_stop(&new) {
        Some(stop) => (
            StatusCode::CREATED,
            Json(CreatedStop {
                route_id,
                stop: StopRecord::from(&stop),
            }),
        )
            .into_response(),
        None => error(StatusCode::NOT_FOUND, "Route not found"),
    }
}

#[derive(Deserialize)]
struct StopQuery {
    id: Option<String>,
}

async fn put_stop(
    State(state): State<ServerState>,
    Query(query): Query<StopQuery>,
    Json(patch): Json<StopPatch>,
) -> Response {
    let Some(id) = query.id.filter(|id| !id.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "Stop ID is required");
    };
    let Ok(id) = id.parse::<i64>() else {
        return error(StatusCode::BAD_REQUEST, "Stop ID must be a number");
    };

    if state.update_stop(id, &patch) {
        message("Stop updated successfully")
    } else {
        error(StatusCode::NOT_FOUND, "Stop not found or no changes")
    }
}

async fn health() -> &'static str {
    "OK"
}
