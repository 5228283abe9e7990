//! The HTTP store client and a route session against the stand-in server.

use std::sync::Arc;

use busline_core::editor::{CommitResolution, SavePolicy};
use busline_core::transit::prelude::*;
use busline_core::{
    DataSource, HttpRouteStore, LoadState, Notification, RouteSession, SessionConfig, StoreConfig,
};
use busline_server::{ServerState, StubServer};

async fn server() -> StubServer {
    StubServer::start(ServerState::seeded(&StaticRouteDataset::bundled()))
        .await
        .unwrap()
}

fn client(server: &StubServer) -> Arc<HttpRouteStore> {
    let config = StoreConfig::new(server.routes_url(), server.stops_url());
    Arc::new(HttpRouteStore::new(&config).unwrap())
}

fn session(server: &StubServer, policy: SavePolicy) -> RouteSession<HttpRouteStore> {
    let config = SessionConfig {
        save_policy: policy,
        ..Default::default()
    };
    RouteSession::new(
        client(server),
        Arc::new(StaticRouteDataset::bundled()),
        &config,
    )
}

#[tokio::test]
async fn lists_routes_with_summaries() {
    let server = server().await;
    let routes = client(&server).list_routes().await.unwrap();

    let numbers: Vec<_> = routes.iter().map(|route| route.number.as_str()).collect();
    assert_eq!(numbers, ["1", "5", "12"]);
    assert_eq!(routes[1].category, RouteCategory::Express);
    assert_eq!(routes[1].stop_count, Some(5));
    assert_eq!(routes[1].duration.as_deref(), Some("35 мин"));
}

#[tokio::test]
async fn unknown_route_is_transport_error() {
    let server = server().await;
    let error = client(&server)
        .get_route_details(&RouteNumber::new("99"))
        .await
        .unwrap_err();
    assert_eq!(error.operation, StoreOperation::GetRouteDetails);
    assert_eq!(error.to_string(), "Failed to fetch route details");
}

#[tokio::test]
async fn renaming_route_one_issues_one_update() {
    let server = server().await;
    let mut session = session(&server, SavePolicy::NameOnly);

    let state = session.open(RouteNumber::new("1")).await;
    assert!(matches!(state, LoadState::Loaded(_)));
    let view = session.view().unwrap();
    assert_eq!(view.details.route.name, "Центр — Жовтневый");
    assert_eq!(view.details.stops.len(), 8);

    session.begin_editing().unwrap();
    session.rename_route("Центр — Новый").unwrap();
    session.add_stop().unwrap();
    assert_eq!(
        session.commit().await,
        Ok(CommitResolution::Accepted { still_editing: false })
    );

    assert_eq!(server.state().count("PUT", "/routes"), 1);
    assert_eq!(server.state().count("POST", "/stops"), 0);
    let stored = server.state().route(&RouteNumber::new("1")).unwrap();
    assert_eq!(stored.route.name, "Центр — Новый");
    assert_eq!(stored.stops.len(), 8);

    let put = server
        .state()
        .requests()
        .into_iter()
        .find(|request| request.method == "PUT")
        .unwrap();
    assert_eq!(put.query.as_deref(), Some("number=1"));
}

#[tokio::test]
async fn unchanged_name_issues_no_update() {
    let server = server().await;
    let mut session = session(&server, SavePolicy::NameOnly);
    session.open(RouteNumber::new("5")).await;

    session.begin_editing().unwrap();
    session.rename_route("Другое").unwrap();
    session.rename_route("Вокзал — Острая Могила").unwrap();
    session.commit().await.unwrap();

    assert_eq!(server.state().count("PUT", "/routes"), 0);
}

#[tokio::test]
async fn outage_falls_back_and_rejects_saves() {
    let server = server().await;
    let mut session = session(&server, SavePolicy::NameOnly);
    server.state().set_outage(true);

    session.open(RouteNumber::new("5")).await;
    let view = session.view().unwrap();
    assert_eq!(
        view.source,
        DataSource::Fallback {
            version: busline_core::transit::provider::BUNDLED_VERSION.to_owned()
        }
    );
    assert!(matches!(
        session.drain_notifications().as_slice(),
        [Notification::ServingFallback { .. }]
    ));

    session.begin_editing().unwrap();
    session.rename_route("Вокзал — Новая").unwrap();
    assert_eq!(session.commit().await, Ok(CommitResolution::Rejected));
    assert!(session.is_editing());
    assert_eq!(session.drain_notifications(), vec![Notification::SaveFailed]);
}

#[tokio::test]
async fn unknown_route_during_outage_is_not_found() {
    let server = server().await;
    server.state().set_outage(true);
    let mut session = session(&server, SavePolicy::NameOnly);

    let state = session.open(RouteNumber::new("99")).await;
    assert_eq!(
        state,
        &LoadState::NotFound {
            number: RouteNumber::new("99")
        }
    );
    assert!(session.view().is_none());
}

#[tokio::test]
async fn persists_new_and_changed_stops() {
    let server = server().await;
    let mut session = session(&server, SavePolicy::NameAndStops);
    session.open(RouteNumber::new("12")).await;

    // Route 12 is seeded last, with stop ids 14..=18
    session.begin_editing().unwrap();
    let added = session.add_stop().unwrap();
    session.rename_stop(added, "Стадион").unwrap();
    session.retime_stop(added, "45 мин").unwrap();
    session.retime_stop(StopId::Remote(15), "6 мин").unwrap();
    session.remove_stop(StopId::Remote(16)).unwrap();
    session.commit().await.unwrap();

    assert_eq!(server.state().count("POST", "/stops"), 1);
    // Stop 15's time, then 17 and 18 moving up a position
    assert_eq!(server.state().count("PUT", "/stops"), 3);

    let stored = server.state().route(&RouteNumber::new("12")).unwrap();
    let names: Vec<_> = stored.stops.iter().map(|stop| stop.name.as_str()).collect();
    // The removed stop stays remotely; there is no delete call
    assert_eq!(
        names,
        [
            "ЦУМ",
            "Улица Коцюбинского",
            "Парк Дружбы",
            "Университет",
            "Артёмовский район",
            "Стадион"
        ]
    );
    let retimed = stored.stop(StopId::Remote(15)).unwrap();
    assert_eq!(retimed.time.as_deref(), Some("6 мин"));

    let view = session.view().unwrap();
    let created = view.details.stops.last().unwrap();
    assert_eq!(created.id, StopId::Remote(19));
    assert_eq!(created.position, 5);
}
