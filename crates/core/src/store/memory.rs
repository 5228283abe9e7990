//! In-memory route store.
//!
//! Behaves like the remote store (server-issued stop ids, "not found" as a
//! failure) and records every call it receives. Failures can be injected per
//! operation and detail lookups can be held back until released, which makes
//! it the backing store for offline demos and tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use busline_transit::prelude::*;
use tokio::sync::Notify;
use tracing::debug;

/// A call received by the store, in arrival order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreCall {
    ListRoutes,
    GetRouteDetails(RouteNumber),
    UpdateRouteName(RouteNumber, String),
    CreateStop(NewStop),
    UpdateStop(i64, StopPatch),
}

#[derive(Default)]
struct State {
    routes: Vec<RouteDetails>,
    next_stop_id: i64,
    failing: Vec<StoreOperation>,
    calls: Vec<StoreCall>,
    gates: HashMap<RouteNumber, Arc<Notify>>,
}

pub struct MemoryRouteStore {
    state: Mutex<State>,
}

impl Default for MemoryRouteStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryRouteStore {
    pub fn new(routes: Vec<RouteDetails>) -> Self {
        let next_stop_id = routes
            .iter()
            .flat_map(|route| route.stops.iter())
            .filter_map(|stop| stop.id.remote())
            .max()
            .unwrap_or(0)
            + 1;

        Self {
            state: Mutex::new(State {
                routes,
                next_stop_id,
                ..Default::default()
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every future call of `operation` fail
    pub fn fail(&self, operation: StoreOperation) {
        let mut state = self.state();
        if !state.failing.contains(&operation) {
            state.failing.push(operation);
        }
    }

    /// Make every operation fail, as if the store were unreachable
    pub fn fail_all(&self) {
        for operation in [
            StoreOperation::ListRoutes,
            StoreOperation::GetRouteDetails,
            StoreOperation::UpdateRouteName,
            StoreOperation::CreateStop,
            StoreOperation::UpdateStop,
        ] {
            self.fail(operation);
        }
    }

    pub fn recover(&self) {
        self.state().failing.clear();
    }

    /// Hold back detail lookups for `number` until [`release`](Self::release) is called
    pub fn hold(&self, number: &RouteNumber) {
        self.state()
            .gates
            .insert(number.clone(), Arc::new(Notify::new()));
    }

    /// Let one held lookup for `number` complete
    pub fn release(&self, number: &RouteNumber) {
        if let Some(gate) = self.state().gates.get(number) {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn route(&self, number: &RouteNumber) -> Option<RouteDetails> {
        self.state()
            .routes
            .iter()
            .find(|route| route.number() == number)
            .cloned()
    }

    fn record(
        &self,
        call: StoreCall,
        operation: StoreOperation,
    ) -> Result<MutexGuard<'_, State>, TransportError> {
        let mut state = self.state();
        debug!(?call, "memory store call");
        state.calls.push(call);
        if state.failing.contains(&operation) {
            return Err(TransportError::new(operation));
        }
        Ok(state)
    }
}

impl RouteStore for MemoryRouteStore {
    fn list_routes<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Route>, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let state = self.record(StoreCall::ListRoutes, StoreOperation::ListRoutes)?;
            let mut routes: Vec<Route> =
                state.routes.iter().map(RouteDetails::to_listing).collect();
            routes.sort_by_key(|route| route.number.numeric());
            Ok(routes)
        })
    }

    fn get_route_details<'a>(
        &'a self,
        number: &'a RouteNumber,
    ) -> Pin<Box<dyn Future<Output = Result<RouteDetails, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let gate = self.state().gates.get(number).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let operation = StoreOperation::GetRouteDetails;
            let state = self.record(StoreCall::GetRouteDetails(number.clone()), operation)?;
            state
                .routes
                .iter()
                .find(|route| route.number() == number)
                .cloned()
                .ok_or(TransportError::new(operation))
        })
    }

    fn update_route_name<'a>(
        &'a self,
        number: &'a RouteNumber,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let operation = StoreOperation::UpdateRouteName;
            let mut state = self.record(
                StoreCall::UpdateRouteName(number.clone(), name.to_owned()),
                operation,
            )?;
            let route = state
                .routes
                .iter_mut()
                .find(|route| route.number() == number)
                .ok_or(TransportError::new(operation))?;
            route.route.name = name.to_owned();
            Ok(())
        })
    }

    fn create_stop<'a>(
        &'a self,
        stop: &'a NewStop,
    ) -> Pin<Box<dyn Future<Output = Result<Stop, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let operation = StoreOperation::CreateStop;
            let mut state = self.record(StoreCall::CreateStop(stop.clone()), operation)?;
            let id = state.next_stop_id;
            let route = state
                .routes
                .iter_mut()
                .find(|route| route.route.id.0 == stop.route_id)
                .ok_or(TransportError::new(operation))?;

            let created = Stop {
                id: StopId::Remote(id),
                name: stop.name.clone(),
                time: Some(stop.time.clone()),
                position: stop.position,
            };
            route.stops.push(created.clone());
            route.stops.sort_by_key(|stop| stop.position);
            state.next_stop_id += 1;
            Ok(created)
        })
    }

    fn update_stop<'a>(
        &'a self,
        id: i64,
        patch: &'a StopPatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let operation = StoreOperation::UpdateStop;
            let mut state = self.record(StoreCall::UpdateStop(id, patch.clone()), operation)?;
            if patch.is_empty() {
                return Err(TransportError::new(operation));
            }

            let stop = state
                .routes
                .iter_mut()
                .flat_map(|route| route.stops.iter_mut())
                .find(|stop| stop.id == StopId::Remote(id))
                .ok_or(TransportError::new(operation))?;
            if let Some(name) = &patch.name {
                stop.name = name.clone();
            }
            if let Some(time) = &patch.time {
                stop.time = Some(time.clone());
            }
            if let Some(position) = patch.position {
                stop.position = position;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> MemoryRouteStore {
        let dataset = StaticRouteDataset::bundled();
        MemoryRouteStore::new(
            ["1", "5"]
                .into_iter()
                .filter_map(|n| dataset.route_details(&RouteNumber::new(n)))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_unknown_route_is_failure() {
        let store = store();
        let error = store
            .get_route_details(&RouteNumber::new("99"))
            .await
            .unwrap_err();
        assert_eq!(error.operation, StoreOperation::GetRouteDetails);
    }

    #[tokio::test]
    async fn test_created_stops_get_fresh_ids() {
        let store = store();
        let created = store
            .create_stop(&NewStop {
                route_id: 5,
                name: "Новая остановка".into(),
                time: "40 мин".into(),
                position: 6,
            })
            .await
            .unwrap();

        // Bundled stop ids run 1..=8
        assert_eq!(created.id, StopId::Remote(9));
        let route = store.route(&RouteNumber::new("5")).unwrap();
        assert_eq!(route.stops.last().unwrap().name, "Новая остановка");
    }

    #[tokio::test]
    async fn test_injected_failures_are_recorded() {
        let store = store();
        store.fail(StoreOperation::UpdateRouteName);

        let number = RouteNumber::new("1");
        assert!(store.update_route_name(&number, "x").await.is_err());
        assert_eq!(store.route(&number).unwrap().route.name, "Центр — Жовтневый");
        assert_eq!(
            store.calls(),
            vec![StoreCall::UpdateRouteName(number.clone(), "x".into())]
        );

        store.recover();
        store.update_route_name(&number, "x").await.unwrap();
        assert_eq!(store.route(&number).unwrap().route.name, "x");
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let store = store();
        assert!(store.update_stop(1, &StopPatch::default()).await.is_err());
    }
}
