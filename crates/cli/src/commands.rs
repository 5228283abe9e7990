use std::sync::Arc;

use busline_core::editor::CommitResolution;
use busline_core::editor::save::StopChanges;
use busline_core::transit::prelude::*;
use busline_core::{DataSource, Notification, RouteCatalog, RouteSession, SessionConfig};
use eyre::{Result, bail};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopAssignment {
    pub id: StopId,
    pub value: String,
}

/// Edits to apply in order: name, additions, renames, retimes, removals
#[derive(Debug, Default)]
pub struct EditScript {
    pub name: Option<String>,
    pub add_stops: Vec<String>,
    pub rename_stops: Vec<StopAssignment>,
    pub retime_stops: Vec<StopAssignment>,
    pub remove_stops: Vec<StopId>,
    pub dry_run: bool,
}

pub async fn routes<S: RouteStore>(
    store: Arc<S>,
    dataset: Arc<StaticRouteDataset>,
    search: Option<&str>,
) -> Result<()> {
    let catalog = RouteCatalog::new(store, dataset);
    let listing = match search {
        Some(query) => catalog.search(query).await,
        None => catalog.list().await,
    };

    if let DataSource::Fallback { version } = &listing.source {
        eprintln!("{}", Notification::ServingFallback { version: version.clone() });
    }
    if listing.routes.is_empty() {
        println!("No routes found");
    }
    for route in &listing.routes {
        println!("{}", route_line(route));
    }
    Ok(())
}

pub async fn show<S: RouteStore>(
    store: Arc<S>,
    dataset: Arc<StaticRouteDataset>,
    config: &SessionConfig,
    number: RouteNumber,
) -> Result<()> {
    let mut session = RouteSession::new(store, dataset, config);
    session.open(number.clone()).await;
    print_notifications(&mut session);

    let Some(view) = session.view() else {
        bail!("route {number} not found");
    };
    print_route(&view.details.route, &view.details.stops);
    Ok(())
}

pub async fn edit<S: RouteStore>(
    store: Arc<S>,
    dataset: Arc<StaticRouteDataset>,
    config: &SessionConfig,
    number: RouteNumber,
    script: EditScript,
) -> Result<()> {
    let mut session = RouteSession::new(store, dataset, config);
    session.open(number.clone()).await;
    print_notifications(&mut session);
    if session.view().is_none() {
        bail!("route {number} not found");
    }

    session.begin_editing()?;
    apply(&mut session, &script)?;

    if script.dry_run {
        if let Some(view) = session.view() {
            let working = view.working.unwrap_or_default();
            let route = Route {
                name: working.name,
                ..view.details.route
            };
            print_route(&route, &working.stops);
        }
        session.discard();
        println!("Dry run, nothing was saved");
        return Ok(());
    }

    let outcome = session.prepare_commit()?.save().await;
    if let Ok(report) = &outcome.result {
        print_unpersisted(&report.unpersisted);
    }
    let resolution = session.finish_commit(outcome);
    print_notifications(&mut session);

    match resolution {
        CommitResolution::Accepted { .. } => {
            if let Some(view) = session.view() {
                print_route(&view.details.route, &view.details.stops);
            }
            Ok(())
        }
        CommitResolution::Rejected => bail!("changes to route {number} were not saved"),
        CommitResolution::Stale => bail!("route {number} changed while saving"),
    }
}

fn apply<S: RouteStore>(session: &mut RouteSession<S>, script: &EditScript) -> Result<()> {
    if let Some(name) = &script.name {
        session.rename_route(name.clone())?;
    }

    for entry in &script.add_stops {
        let (name, time) = match entry.split_once('=') {
            Some((name, time)) => (name, Some(time)),
            None => (entry.as_str(), None),
        };
        let id = session.add_stop()?;
        session.rename_stop(id, name)?;
        if let Some(time) = time {
            session.retime_stop(id, time)?;
        }
    }

    for StopAssignment { id, value } in &script.rename_stops {
        if !session.rename_stop(*id, value.clone())? {
            warn!(stop = %id, "no such stop to rename");
        }
    }
    for StopAssignment { id, value } in &script.retime_stops {
        if !session.retime_stop(*id, value.clone())? {
            warn!(stop = %id, "no such stop to retime");
        }
    }
    for id in &script.remove_stops {
        if session.remove_stop(*id)?.is_none() {
            warn!(stop = %id, "no such stop to remove");
        }
    }
    Ok(())
}

fn print_notifications<S: RouteStore>(session: &mut RouteSession<S>) {
    for notification in session.drain_notifications() {
        eprintln!("{notification}");
    }
}

fn print_unpersisted(changes: &StopChanges) {
    for stop in &changes.added {
        eprintln!("not saved: new stop {:?}", stop.name);
    }
    for stop in &changes.changed {
        eprintln!("not saved: changes to stop {} {:?}", stop.id, stop.name);
    }
    for stop in &changes.removed {
        eprintln!("not saved: removal of stop {} {:?}", stop.id, stop.name);
    }
}

fn route_line(route: &Route) -> String {
    let mut line = format!(
        "{:>4}  {}  [{}]",
        route.number.as_str(),
        route.name,
        route.category
    );
    if let Some(count) = route.stop_count {
        line.push_str(&format!(", {count} stops"));
    }
    if let Some(duration) = &route.duration {
        line.push_str(&format!(", {duration}"));
    }
    line
}

fn print_route(route: &Route, stops: &[Stop]) {
    println!(
        "Route {} {} ({}, {})",
        route.number, route.name, route.category, route.color
    );
    for stop in stops {
        println!("{}", stop_line(stop));
    }

    let labels: Vec<TimeLabel> = stops.iter().map(Stop::time_label).collect();
    if let Some(index) = first_out_of_order(&labels) {
        warn!(stop = %stops[index].id, "stop times are out of order");
    }
}

fn stop_line(stop: &Stop) -> String {
    let time = stop.time.as_deref().unwrap_or_default();
    let id = stop.id.to_string();
    format!("{:>4}  {id:<8} {}  {time}", stop.position, stop.name)
        .trim_end()
        .to_owned()
}
