//! Editable stop list controller.
//!
//! The controller owns two copies of a route's editable fields: the baseline
//! (what the remote store is believed to hold) and, while editing, a working
//! buffer that all mutations apply to. Committing hands both to the save
//! coordinator; discarding drops the working buffer.

use busline_transit::prelude::*;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::editor::EditorError;
use crate::editor::save::{CommitRequest, SaveRejected, SaveReport};

/// The editable fields of a route
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EditableRoute {
    pub name: String,
    pub stops: Vec<Stop>,
}

impl EditableRoute {
    pub fn from_details(details: &RouteDetails) -> Self {
        Self {
            name: details.route.name.clone(),
            stops: details.stops.clone(),
        }
    }

    pub fn stop(&self, id: StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| stop.id == id)
    }

    fn stop_mut(&mut self, id: StopId) -> Option<&mut Stop> {
        self.stops.iter_mut().find(|stop| stop.id == id)
    }

    /// Swap local ids for the ids the remote store issued
    fn reconcile(&mut self, created: &[(StopId, Stop)]) {
        for (local, remote) in created {
            if let Some(stop) = self.stop_mut(*local) {
                stop.id = remote.id;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Viewing,
    Editing,
}

/// Identifies one commit of one loaded route
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitTicket {
    epoch: u64,
    sequence: u64,
}

/// What happened when a save result was handed back to the editor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitResolution {
    /// The committed values are the new baseline
    Accepted { still_editing: bool },
    /// Nothing changed locally; the working buffer is still open
    Rejected,
    /// The result belonged to a route or commit that is no longer current
    Stale,
}

pub struct StopListEditor {
    baseline: EditableRoute,
    working: Option<EditableRoute>,
    loaded: bool,

    // Commit bookkeeping
    epoch: u64,
    commits: u64,
    pending: Option<CommitTicket>,

    next_local_id: u64,
    placeholder_stop_name: String,
    position_base: PositionBase,
}

impl StopListEditor {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            baseline: EditableRoute::default(),
            working: None,
            loaded: false,
            epoch: 0,
            commits: 0,
            pending: None,
            next_local_id: 1,
            placeholder_stop_name: config.placeholder_stop_name.clone(),
            position_base: config.position_base,
        }
    }

    /// Replace the baseline with freshly loaded details and return to viewing.
    ///
    /// Any commit still in flight for the previous baseline becomes stale.
    pub fn seed(&mut self, details: &RouteDetails) {
        self.baseline = EditableRoute::from_details(details);
        self.working = None;
        self.loaded = true;
        self.epoch += 1;
        self.pending = None;
    }

    /// Forget the loaded route entirely
    pub fn clear(&mut self) {
        self.baseline = EditableRoute::default();
        self.working = None;
        self.loaded = false;
        self.epoch += 1;
        self.pending = None;
    }

    pub fn mode(&self) -> Mode {
        if self.working.is_some() {
            Mode::Editing
        } else {
            Mode::Viewing
        }
    }

    pub fn is_editing(&self) -> bool {
        self.working.is_some()
    }

    pub fn is_committing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn baseline(&self) -> &EditableRoute {
        &self.baseline
    }

    pub fn working(&self) -> Option<&EditableRoute> {
        self.working.as_ref()
    }

    /// What a view should show: the working buffer while editing, otherwise
    /// the baseline
    pub fn current(&self) -> &EditableRoute {
        self.working.as_ref().unwrap_or(&self.baseline)
    }

    pub fn begin_editing(&mut self) -> Result<(), EditorError> {
        if !self.loaded {
            return Err(EditorError::NothingLoaded);
        }
        if self.working.is_some() {
            return Err(EditorError::AlreadyEditing);
        }
        self.working = Some(self.baseline.clone());
        debug!("entered editing mode");
        Ok(())
    }

    fn working_mut(&mut self) -> Result<&mut EditableRoute, EditorError> {
        self.working.as_mut().ok_or(EditorError::NotEditing)
    }

    // ---- Mutations ----

    /// Append a placeholder stop and return its local id
    pub fn add_stop(&mut self) -> Result<StopId, EditorError> {
        let id = StopId::Local(self.next_local_id);
        let name = self.placeholder_stop_name.clone();
        let first_position = self.position_base.position_of(0);

        let working = self.working_mut()?;
        let position = working
            .stops
            .last()
            .map_or(first_position, |last| last.position.saturating_add(1));
        working.stops.push(Stop {
            id,
            name,
            time: Some(String::new()),
            position,
        });

        self.next_local_id += 1;
        Ok(id)
    }

    /// Returns `false` if no stop has this id
    pub fn rename_stop(
        &mut self,
        id: StopId,
        name: impl Into<String>,
    ) -> Result<bool, EditorError> {
        let stop = self.working_mut()?.stop_mut(id);
        Ok(stop.map(|stop| stop.name = name.into()).is_some())
    }

    /// Returns `false` if no stop has this id
    pub fn retime_stop(
        &mut self,
        id: StopId,
        time: impl Into<String>,
    ) -> Result<bool, EditorError> {
        let stop = self.working_mut()?.stop_mut(id);
        Ok(stop.map(|stop| stop.time = Some(time.into())).is_some())
    }

    /// Remove a stop; the stops after it move up one position each
    pub fn remove_stop(&mut self, id: StopId) -> Result<Option<Stop>, EditorError> {
        let working = self.working_mut()?;
        let Some(index) = working.stops.iter().position(|stop| stop.id == id) else {
            return Ok(None);
        };

        let removed = working.stops.remove(index);
        let mut vacated = removed.position;
        for stop in &mut working.stops[index..] {
            std::mem::swap(&mut stop.position, &mut vacated);
        }
        Ok(Some(removed))
    }

    pub fn rename_route(&mut self, name: impl Into<String>) -> Result<(), EditorError> {
        self.working_mut()?.name = name.into();
        Ok(())
    }

    // ---- Commit / discard ----

    /// Drop all pending edits and return to viewing
    pub fn discard(&mut self) {
        if self.working.take().is_some() {
            debug!("discarded pending edits");
        }
    }

    /// Snapshot the working buffer for saving.
    ///
    /// Only one commit may be outstanding. Edits made while it is in flight
    /// stay in the working buffer.
    pub fn prepare_commit(&mut self) -> Result<CommitRequest, EditorError> {
        if self.pending.is_some() {
            return Err(EditorError::CommitInProgress);
        }
        let working = self.working.as_ref().ok_or(EditorError::NotEditing)?;

        self.commits += 1;
        let ticket = CommitTicket {
            epoch: self.epoch,
            sequence: self.commits,
        };
        self.pending = Some(ticket);

        Ok(CommitRequest {
            ticket,
            working: working.clone(),
            baseline: self.baseline.clone(),
        })
    }

    /// Move whatever reached the store before a failed commit into the baseline
    fn absorb_partial(&mut self, written: &EditableRoute, rejected: &SaveRejected) {
        if rejected.name_updated {
            self.baseline.name = written.name.clone();
        }

        let stored: Vec<&Stop> = written
            .stops
            .iter()
            .filter(|stop| rejected.wrote_stop(stop.id))
            .collect();
        if stored.is_empty() {
            return;
        }
        for stop in stored {
            match self.baseline.stop_mut(stop.id) {
                Some(known) => *known = stop.clone(),
                None => self.baseline.stops.push(stop.clone()),
            }
        }
        self.baseline.stops.sort_by_key(|stop| stop.position);
        debug!(
            name_updated = rejected.name_updated,
            created = rejected.created.len(),
            updated = rejected.updated.len(),
            "kept partial writes of a rejected commit"
        );
    }

    /// Hand the save result for `request` back to the editor
    pub fn finish_commit(
        &mut self,
        request: CommitRequest,
        result: &Result<SaveReport, SaveRejected>,
    ) -> CommitResolution {
        if self.pending != Some(request.ticket) {
            debug!(ticket = ?request.ticket, "ignoring stale save result");
            return CommitResolution::Stale;
        }
        self.pending = None;

        let created = match result {
            Ok(report) => &report.created,
            Err(rejected) => &rejected.created,
        };
        if let Some(working) = self.working.as_mut() {
            working.reconcile(created);
        }

        match result {
            Ok(_) => {
                let mut committed = request.working;
                committed.reconcile(created);
                self.baseline = committed;

                if self.working.as_ref() == Some(&self.baseline) {
                    self.working = None;
                }
                let still_editing = self.working.is_some();
                info!(still_editing, "route changes saved");
                CommitResolution::Accepted { still_editing }
            }
            Err(rejected) => {
                let mut written = request.working;
                written.reconcile(created);
                self.absorb_partial(&written, rejected);
                info!(error = %rejected.error, "route changes were not saved");
                CommitResolution::Rejected
            }
        }
    }
}
