//! Persisting committed edits to the remote store.

use std::collections::HashMap;
use std::sync::Arc;

use busline_transit::prelude::*;
use tracing::{debug, info, warn};

use crate::editor::controller::{CommitTicket, EditableRoute};

/// Which edits a commit writes to the remote store
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum SavePolicy {
    /// Only the route name; stop edits stay local
    #[default]
    NameOnly,
    /// The route name, new stops and changed stops. Deletions stay local.
    NameAndStops,
}

/// The route a commit belongs to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveTarget {
    pub number: RouteNumber,
    pub route_id: RouteId,
    /// Stop ids came from the remote store. Fallback data carries
    /// synthesized ids that must never be written back.
    pub stops_writable: bool,
}

impl SaveTarget {
    pub fn of(details: &RouteDetails) -> Self {
        Self {
            number: details.route.number.clone(),
            route_id: details.route.id,
            stops_writable: true,
        }
    }
}

/// A snapshot of the working buffer taken at commit time
#[derive(Clone, Debug)]
pub struct CommitRequest {
    pub ticket: CommitTicket,
    pub working: EditableRoute,
    pub baseline: EditableRoute,
}

impl CommitRequest {
    pub fn name_changed(&self) -> bool {
        self.working.name != self.baseline.name
    }
}

/// Stop-level differences between a baseline and a working buffer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StopChanges {
    pub added: Vec<Stop>,
    pub changed: Vec<Stop>,
    pub removed: Vec<Stop>,
}

impl StopChanges {
    pub fn between(baseline: &EditableRoute, working: &EditableRoute) -> Self {
        let before: HashMap<StopId, &Stop> =
            baseline.stops.iter().map(|stop| (stop.id, stop)).collect();

        let mut changes = Self::default();
        for stop in &working.stops {
            match before.get(&stop.id) {
                None => changes.added.push(stop.clone()),
                Some(old) if !StopPatch::between(old, stop).is_empty() => {
                    changes.changed.push(stop.clone())
                }
                Some(_) => {}
            }
        }
        changes.removed = baseline
            .stops
            .iter()
            .filter(|stop| working.stop(stop.id).is_none())
            .cloned()
            .collect();
        changes
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// What an accepted commit wrote
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub name_updated: bool,
    /// Local id and the stop the store created for it
    pub created: Vec<(StopId, Stop)>,
    /// Remote ids of stops that were patched
    pub updated: Vec<i64>,
    /// Stop edits that were not written
    pub unpersisted: StopChanges,
}

impl SaveReport {
    pub fn unpersisted_deletions(&self) -> &[Stop] {
        &self.unpersisted.removed
    }
}

/// A commit the remote store refused
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{error}")]
pub struct SaveRejected {
    pub error: TransportError,
    /// The route name was written before the failure
    pub name_updated: bool,
    /// Stops created before the failure
    pub created: Vec<(StopId, Stop)>,
    /// Remote ids of stops patched before the failure
    pub updated: Vec<i64>,
}

impl SaveRejected {
    fn new(error: TransportError, report: &mut SaveReport) -> Self {
        Self {
            error,
            name_updated: report.name_updated,
            created: std::mem::take(&mut report.created),
            updated: std::mem::take(&mut report.updated),
        }
    }

    /// Whether the store holds this stop as it was in the commit
    pub fn wrote_stop(&self, id: StopId) -> bool {
        match id {
            StopId::Remote(remote) => {
                self.updated.contains(&remote)
                    || self.created.iter().any(|(_, stop)| stop.id == id)
            }
            StopId::Local(_) => false,
        }
    }
}

pub struct SaveCoordinator<S> {
    store: Arc<S>,
    policy: SavePolicy,
}

impl<S> Clone for SaveCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
        }
    }
}

impl<S: RouteStore> SaveCoordinator<S> {
    pub fn new(store: Arc<S>, policy: SavePolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> SavePolicy {
        self.policy
    }

    /// Write `request` to the store. Writes stop at the first failure.
    pub async fn save(
        &self,
        target: &SaveTarget,
        request: &CommitRequest,
    ) -> Result<SaveReport, SaveRejected> {
        let mut report = SaveReport::default();

        if request.name_changed() {
            debug!(number = %target.number, name = %request.working.name, "updating route name");
            self.store
                .update_route_name(&target.number, &request.working.name)
                .await
                .map_err(|error| SaveRejected::new(error, &mut report))?;
            report.name_updated = true;
        }

        let changes = StopChanges::between(&request.baseline, &request.working);
        let write_stops = match self.policy {
            SavePolicy::NameOnly => false,
            SavePolicy::NameAndStops if !target.stops_writable => {
                warn!(number = %target.number, "stop ids are not remote, keeping stop edits local");
                false
            }
            SavePolicy::NameAndStops => true,
        };

        if write_stops {
            self.save_stops(target, request, &mut report).await?;
            if !changes.removed.is_empty() {
                warn!(
                    number = %target.number,
                    removed = changes.removed.len(),
                    "stop deletions cannot be persisted"
                );
            }
            report.unpersisted.removed = changes.removed;
        } else {
            if !changes.is_empty() {
                debug!(
                    number = %target.number,
                    added = changes.added.len(),
                    changed = changes.changed.len(),
                    removed = changes.removed.len(),
                    "stop edits are not persisted"
                );
            }
            report.unpersisted = changes;
        }

        info!(
            number = %target.number,
            name_updated = report.name_updated,
            created = report.created.len(),
            updated = report.updated.len(),
            "commit saved"
        );
        Ok(report)
    }

    async fn save_stops(
        &self,
        target: &SaveTarget,
        request: &CommitRequest,
        report: &mut SaveReport,
    ) -> Result<(), SaveRejected> {
        for stop in &request.working.stops {
            let result = match stop.id {
                StopId::Local(_) => self.create(target, stop, report).await,
                StopId::Remote(id) => {
                    let patch = match request.baseline.stop(stop.id) {
                        Some(old) => StopPatch::between(old, stop),
                        None => StopPatch::full(stop),
                    };
                    if patch.is_empty() {
                        continue;
                    }
                    self.store
                        .update_stop(id, &patch)
                        .await
                        .map(|()| report.updated.push(id))
                }
            };

            if let Err(error) = result {
                warn!(number = %target.number, stop = %stop.id, %error, "stop write failed");
                return Err(SaveRejected::new(error, report));
            }
        }
        Ok(())
    }

    async fn create(
        &self,
        target: &SaveTarget,
        stop: &Stop,
        report: &mut SaveReport,
    ) -> Result<(), TransportError> {
        let new = NewStop {
            route_id: target.route_id.0,
            name: stop.name.clone(),
            time: stop.time.clone().unwrap_or_default(),
            position: stop.position,
        };
        let created = self.store.create_stop(&new).await?;
        debug!(local = %stop.id, remote = %created.id, "stop created");
        report.created.push((stop.id, created));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::editor::{CommitResolution, StopListEditor};
    use crate::store::{MemoryRouteStore, StoreCall};

    fn route_five() -> RouteDetails {
        StaticRouteDataset::bundled()
            .route_details(&RouteNumber::new("5"))
            .unwrap()
    }

    fn setup(
        policy: SavePolicy,
    ) -> (
        Arc<MemoryRouteStore>,
        SaveCoordinator<MemoryRouteStore>,
        StopListEditor,
    ) {
        let details = route_five();
        let store = Arc::new(MemoryRouteStore::new(vec![details.clone()]));
        let coordinator = SaveCoordinator::new(store.clone(), policy);

        let mut editor = StopListEditor::new(&SessionConfig::default());
        editor.seed(&details);
        editor.begin_editing().unwrap();
        (store, coordinator, editor)
    }

    fn writes(store: &MemoryRouteStore) -> Vec<StoreCall> {
        store
            .calls()
            .into_iter()
            .filter(|call| !matches!(call, StoreCall::ListRoutes | StoreCall::GetRouteDetails(_)))
            .collect()
    }

    #[tokio::test]
    async fn test_unchanged_name_writes_nothing() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameOnly);
        editor.rename_stop(StopId::Remote(1), "Автостанция").unwrap();

        let request = editor.prepare_commit().unwrap();
        let report = coordinator.save(&SaveTarget::of(&route_five()), &request).await.unwrap();

        assert!(!report.name_updated);
        assert_eq!(report.unpersisted.changed.len(), 1);
        assert!(writes(&store).is_empty());
    }

    #[tokio::test]
    async fn test_changed_name_is_written_once() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameOnly);
        editor.rename_route("Вокзал — Новая").unwrap();
        editor.add_stop().unwrap();

        let request = editor.prepare_commit().unwrap();
        let report = coordinator.save(&SaveTarget::of(&route_five()), &request).await.unwrap();

        assert!(report.name_updated);
        assert_eq!(report.unpersisted.added.len(), 1);
        assert_eq!(
            writes(&store),
            vec![StoreCall::UpdateRouteName(RouteNumber::new("5"), "Вокзал — Новая".into())]
        );
    }

    #[tokio::test]
    async fn test_whitespace_only_rename_counts_as_change() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameOnly);
        editor.rename_route("Вокзал — Острая Могила ").unwrap();

        let request = editor.prepare_commit().unwrap();
        coordinator.save(&SaveTarget::of(&route_five()), &request).await.unwrap();
        assert_eq!(writes(&store).len(), 1);
    }

    #[tokio::test]
    async fn test_failed_name_update_is_rejected() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameOnly);
        store.fail(StoreOperation::UpdateRouteName);
        editor.rename_route("Вокзал — Новая").unwrap();

        let request = editor.prepare_commit().unwrap();
        let rejected = coordinator
            .save(&SaveTarget::of(&route_five()), &request)
            .await
            .unwrap_err();
        assert_eq!(rejected.error.operation, StoreOperation::UpdateRouteName);
        assert_eq!(rejected.to_string(), "Failed to update route");
    }

    #[tokio::test]
    async fn test_stops_are_created_and_patched() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameAndStops);
        let local = editor.add_stop().unwrap();
        editor.rename_stop(local, "Новый рынок").unwrap();
        editor.retime_stop(local, "42 мин").unwrap();
        editor.retime_stop(StopId::Remote(2), "8 мин").unwrap();
        editor.remove_stop(StopId::Remote(4)).unwrap();

        let request = editor.prepare_commit().unwrap();
        let result = coordinator.save(&SaveTarget::of(&route_five()), &request).await;
        let report = result.clone().unwrap();

        assert!(!report.name_updated);
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].0, local);
        assert_eq!(report.unpersisted_deletions().len(), 1);
        assert!(report.unpersisted.added.is_empty());

        // Stop 5 moved up into the removed stop's position
        assert_eq!(report.updated, vec![2, 5]);
        assert_eq!(
            writes(&store)[0],
            StoreCall::UpdateStop(
                2,
                StopPatch {
                    time: Some("8 мин".into()),
                    ..Default::default()
                }
            )
        );

        let remote = report.created[0].1.id;
        assert_eq!(
            editor.finish_commit(request, &result),
            CommitResolution::Accepted { still_editing: false }
        );
        assert_eq!(editor.baseline().stop(remote).unwrap().name, "Новый рынок");

        let saved = store.route(&RouteNumber::new("5")).unwrap();
        assert!(saved.stops.iter().any(|stop| stop.name == "Новый рынок"));
    }

    #[tokio::test]
    async fn test_writes_stop_at_first_failure() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameAndStops);
        store.fail(StoreOperation::UpdateStop);
        let local = editor.add_stop().unwrap();
        editor.rename_stop(StopId::Remote(1), "Автостанция").unwrap();

        let request = editor.prepare_commit().unwrap();
        let result = coordinator.save(&SaveTarget::of(&route_five()), &request).await;
        let rejected = result.as_ref().unwrap_err();
        assert_eq!(rejected.error.operation, StoreOperation::UpdateStop);
        assert!(rejected.created.is_empty());
        assert_eq!(editor.finish_commit(request, &result), CommitResolution::Rejected);

        // The new stop after the failing one was never sent
        assert_eq!(
            writes(&store),
            vec![StoreCall::UpdateStop(
                1,
                StopPatch {
                    name: Some("Автостанция".into()),
                    ..Default::default()
                }
            )]
        );
        assert!(editor.working().unwrap().stop(local).is_some());

        store.recover();
        let request = editor.prepare_commit().unwrap();
        let result = coordinator.save(&SaveTarget::of(&route_five()), &request).await;
        assert_eq!(result.as_ref().unwrap().created.len(), 1);
        assert_eq!(
            editor.finish_commit(request, &result),
            CommitResolution::Accepted { still_editing: false }
        );
    }

    #[tokio::test]
    async fn test_retry_after_failure_does_not_duplicate_stops() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameAndStops);
        let first = editor.add_stop().unwrap();
        let second = editor.add_stop().unwrap();
        editor.rename_stop(second, "Конечная").unwrap();

        // The second creation fails after the first succeeded
        let request = editor.prepare_commit().unwrap();
        let target = SaveTarget::of(&route_five());
        let partial = {
            let mut report = SaveReport::default();
            coordinator
                .create(&target, request.working.stop(first).unwrap(), &mut report)
                .await
                .unwrap();
            Err(SaveRejected::new(
                TransportError::new(StoreOperation::CreateStop),
                &mut report,
            ))
        };
        assert_eq!(editor.finish_commit(request, &partial), CommitResolution::Rejected);

        let working = editor.working().unwrap();
        assert!(working.stop(first).is_none());
        assert!(working.stop(second).is_some());

        let request = editor.prepare_commit().unwrap();
        let report = coordinator.save(&target, &request).await.unwrap();
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].0, second);

        let creates = store
            .calls()
            .into_iter()
            .filter(|call| matches!(call, StoreCall::CreateStop(_)))
            .count();
        assert_eq!(creates, 2);
        // The stop created by the failed attempt is not patched again
        assert!(!store
            .calls()
            .iter()
            .any(|call| matches!(call, StoreCall::UpdateStop(..))));
    }

    #[tokio::test]
    async fn test_rejected_commit_keeps_written_name() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameAndStops);
        store.fail(StoreOperation::UpdateStop);
        editor.rename_route("Новое имя").unwrap();
        editor.rename_stop(StopId::Remote(1), "Автостанция").unwrap();

        let request = editor.prepare_commit().unwrap();
        let result = coordinator.save(&SaveTarget::of(&route_five()), &request).await;
        assert!(result.as_ref().unwrap_err().name_updated);
        assert_eq!(editor.finish_commit(request, &result), CommitResolution::Rejected);

        editor.discard();
        let remote = store.route(&RouteNumber::new("5")).unwrap();
        assert_eq!(remote.route.name, "Новое имя");
        assert_eq!(editor.baseline().name, remote.route.name);
        assert_eq!(editor.baseline().stops[0].name, "Автовокзал");

        // A retry only sends what is still missing
        store.recover();
        editor.begin_editing().unwrap();
        editor.rename_stop(StopId::Remote(1), "Автостанция").unwrap();
        let request = editor.prepare_commit().unwrap();
        let report = coordinator
            .save(&SaveTarget::of(&route_five()), &request)
            .await
            .unwrap();
        assert!(!report.name_updated);
        assert_eq!(report.updated, vec![1]);
    }

    #[tokio::test]
    async fn test_fallback_stop_ids_are_never_written() {
        let (store, coordinator, mut editor) = setup(SavePolicy::NameAndStops);
        editor.add_stop().unwrap();
        editor.rename_stop(StopId::Remote(3), "Рынок").unwrap();

        let target = SaveTarget {
            stops_writable: false,
            ..SaveTarget::of(&route_five())
        };
        let request = editor.prepare_commit().unwrap();
        let report = coordinator.save(&target, &request).await.unwrap();

        assert!(writes(&store).is_empty());
        assert_eq!(report.unpersisted.added.len(), 1);
        assert_eq!(report.unpersisted.changed.len(), 1);
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(SavePolicy::NameOnly.to_string(), "name-only");
        assert_eq!("name-and-stops".parse::<SavePolicy>().unwrap(), SavePolicy::NameAndStops);
    }
}
