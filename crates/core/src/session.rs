//! One route view: a loader, an editor and a save coordinator working on the
//! same route, plus the notifications a UI should show.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use busline_transit::prelude::*;
use tracing::debug;

use crate::config::SessionConfig;
use crate::editor::{
    CommitRequest, CommitResolution, EditableRoute, EditorError, Mode, SaveCoordinator,
    SaveRejected, SaveReport, SaveTarget, StopListEditor,
};
use crate::loader::{DataSource, LoadOutcome, LoadState, PendingLoad, RouteDetailLoader};

/// Transient messages for the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    Saved,
    SaveFailed,
    /// The remote store was unreachable and bundled data is shown instead
    ServingFallback { version: String },
    RouteNotFound { number: RouteNumber },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Saved => write!(f, "Changes saved"),
            Notification::SaveFailed => write!(f, "Failed to save changes"),
            Notification::ServingFallback { version } => {
                write!(f, "Remote store unavailable, showing offline data ({version})")
            }
            Notification::RouteNotFound { number } => write!(f, "Route {number} not found"),
        }
    }
}

/// What the presentation layer renders
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteView {
    /// Loaded details with the saved name and stops applied
    pub details: RouteDetails,
    pub source: DataSource,
    /// The working buffer while editing
    pub working: Option<EditableRoute>,
}

impl RouteView {
    pub fn is_editing(&self) -> bool {
        self.working.is_some()
    }
}

/// A commit that has been snapshotted but not yet written
pub struct PendingCommit<S> {
    request: CommitRequest,
    target: SaveTarget,
    coordinator: SaveCoordinator<S>,
}

impl<S: RouteStore> PendingCommit<S> {
    pub fn request(&self) -> &CommitRequest {
        &self.request
    }

    /// Perform the remote writes. The future owns everything it needs, so it
    /// can be spawned.
    pub async fn save(self) -> CommitOutcome {
        let result = self.coordinator.save(&self.target, &self.request).await;
        CommitOutcome {
            request: self.request,
            result,
        }
    }
}

#[derive(Debug)]
pub struct CommitOutcome {
    pub request: CommitRequest,
    pub result: Result<SaveReport, SaveRejected>,
}

pub struct RouteSession<S> {
    loader: RouteDetailLoader<S>,
    editor: StopListEditor,
    coordinator: SaveCoordinator<S>,
    target: Option<SaveTarget>,
    notifications: VecDeque<Notification>,
}

impl<S: RouteStore> RouteSession<S> {
    pub fn new(store: Arc<S>, dataset: Arc<dyn RouteDataset>, config: &SessionConfig) -> Self {
        Self {
            loader: RouteDetailLoader::new(store.clone(), dataset),
            editor: StopListEditor::new(config),
            coordinator: SaveCoordinator::new(store, config.save_policy),
            target: None,
            notifications: VecDeque::new(),
        }
    }

    // ---- Loading ----

    /// Switch to `number`. Pending edits and any commit in flight for the
    /// previous route are dropped.
    pub fn request(&mut self, number: RouteNumber) -> PendingLoad<S> {
        if self.editor.is_editing() {
            debug!(%number, "route switch drops pending edits");
        }
        self.editor.clear();
        self.target = None;
        self.loader.request(number)
    }

    /// Apply a finished load. Returns `false` if it was stale.
    pub fn apply(&mut self, outcome: LoadOutcome) -> bool {
        if !self.loader.apply(outcome) {
            return false;
        }

        match self.loader.state() {
            LoadState::Loaded(details) => {
                self.editor.seed(details);
                self.target = Some(SaveTarget::of(details));
            }
            LoadState::Fallback { details, version } => {
                self.editor.seed(details);
                self.target = Some(SaveTarget {
                    stops_writable: false,
                    ..SaveTarget::of(details)
                });
                self.notifications.push_back(Notification::ServingFallback {
                    version: version.clone(),
                });
            }
            LoadState::NotFound { number } => {
                self.notifications.push_back(Notification::RouteNotFound {
                    number: number.clone(),
                });
            }
            LoadState::Idle | LoadState::Loading { .. } => {}
        }
        true
    }

    /// Load `number` and wait for the result
    pub async fn open(&mut self, number: RouteNumber) -> &LoadState {
        let outcome = self.request(number).fetch().await;
        self.apply(outcome);
        self.loader.state()
    }

    pub fn load_state(&self) -> &LoadState {
        self.loader.state()
    }

    pub fn view(&self) -> Option<RouteView> {
        let state = self.loader.state();
        let loaded = state.details()?;
        let baseline = self.editor.baseline();

        let mut details = loaded.clone();
        details.route.name = baseline.name.clone();
        details.stops = baseline.stops.clone();

        Some(RouteView {
            details,
            source: state.source()?,
            working: self.editor.working().cloned(),
        })
    }

    // ---- Editing ----

    pub fn mode(&self) -> Mode {
        self.editor.mode()
    }

    pub fn is_editing(&self) -> bool {
        self.editor.is_editing()
    }

    pub fn is_committing(&self) -> bool {
        self.editor.is_committing()
    }

    pub fn begin_editing(&mut self) -> Result<(), EditorError> {
        self.editor.begin_editing()
    }

    pub fn add_stop(&mut self) -> Result<StopId, EditorError> {
        self.editor.add_stop()
    }

    pub fn rename_stop(
        &mut self,
        id: StopId,
        name: impl Into<String>,
    ) -> Result<bool, EditorError> {
        self.editor.rename_stop(id, name)
    }

    pub fn retime_stop(
        &mut self,
        id: StopId,
        time: impl Into<String>,
    ) -> Result<bool, EditorError> {
        self.editor.retime_stop(id, time)
    }

    pub fn remove_stop(&mut self, id: StopId) -> Result<Option<Stop>, EditorError> {
        self.editor.remove_stop(id)
    }

    pub fn rename_route(&mut self, name: impl Into<String>) -> Result<(), EditorError> {
        self.editor.rename_route(name)
    }

    pub fn discard(&mut self) {
        self.editor.discard();
    }

    // ---- Committing ----

    pub fn prepare_commit(&mut self) -> Result<PendingCommit<S>, EditorError> {
        let target = self.target.clone().ok_or(EditorError::NothingLoaded)?;
        let request = self.editor.prepare_commit()?;
        Ok(PendingCommit {
            request,
            target,
            coordinator: self.coordinator.clone(),
        })
    }

    pub fn finish_commit(&mut self, outcome: CommitOutcome) -> CommitResolution {
        let resolution = self.editor.finish_commit(outcome.request, &outcome.result);
        match resolution {
            CommitResolution::Accepted { .. } => self.notifications.push_back(Notification::Saved),
            CommitResolution::Rejected => self.notifications.push_back(Notification::SaveFailed),
            CommitResolution::Stale => {}
        }
        resolution
    }

    /// Save the working buffer and wait for the result
    pub async fn commit(&mut self) -> Result<CommitResolution, EditorError> {
        let outcome = self.prepare_commit()?.save().await;
        Ok(self.finish_commit(outcome))
    }

    // ---- Notifications ----

    /// Take every notification queued since the last call
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }
}
