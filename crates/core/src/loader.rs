//! Route detail loading with fallback to a bundled dataset.
//!
//! Each request is tagged with a ticket. Only the outcome carrying the most
//! recent ticket is applied; anything older is ignored when it arrives, so a
//! slow response for a previous route can never overwrite the current one.
//! The underlying network call is not cancelled.

use std::sync::Arc;

use busline_transit::prelude::*;
use tracing::{debug, info, warn};

/// Where the currently exposed route details came from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataSource {
    Remote,
    /// Served from the fallback dataset with this version; possibly stale
    Fallback { version: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading {
        number: RouteNumber,
    },
    Loaded(RouteDetails),
    Fallback {
        details: RouteDetails,
        version: String,
    },
    NotFound {
        number: RouteNumber,
    },
}

impl LoadState {
    /// Route details to display, if any
    pub fn details(&self) -> Option<&RouteDetails> {
        match self {
            LoadState::Loaded(details) | LoadState::Fallback { details, .. } => Some(details),
            LoadState::Idle | LoadState::Loading { .. } | LoadState::NotFound { .. } => None,
        }
    }

    pub fn source(&self) -> Option<DataSource> {
        match self {
            LoadState::Loaded(_) => Some(DataSource::Remote),
            LoadState::Fallback { version, .. } => Some(DataSource::Fallback {
                version: version.clone(),
            }),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// A detail request that has been issued but not yet sent
pub struct PendingLoad<S> {
    ticket: LoadTicket,
    number: RouteNumber,
    store: Arc<S>,
}

impl<S: RouteStore> PendingLoad<S> {
    pub fn ticket(&self) -> LoadTicket {
        self.ticket
    }

    pub fn number(&self) -> &RouteNumber {
        &self.number
    }

    /// Perform the remote call. The future owns everything it needs, so it
    /// can be spawned.
    pub async fn fetch(self) -> LoadOutcome {
        let result = self.store.get_route_details(&self.number).await;
        LoadOutcome {
            ticket: self.ticket,
            number: self.number,
            result,
        }
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: LoadTicket,
    pub number: RouteNumber,
    pub result: Result<RouteDetails, TransportError>,
}

pub struct RouteDetailLoader<S> {
    store: Arc<S>,
    dataset: Arc<dyn RouteDataset>,
    state: LoadState,
    in_flight: Option<LoadTicket>,
    next_ticket: u64,
}

impl<S: RouteStore> RouteDetailLoader<S> {
    pub fn new(store: Arc<S>, dataset: Arc<dyn RouteDataset>) -> Self {
        Self {
            store,
            dataset,
            state: LoadState::Idle,
            in_flight: None,
            next_ticket: 0,
        }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn dataset(&self) -> &dyn RouteDataset {
        self.dataset.as_ref()
    }

    /// Start loading `number`, superseding any request still in flight.
    ///
    /// Previously loaded details are dropped immediately.
    pub fn request(&mut self, number: RouteNumber) -> PendingLoad<S> {
        self.next_ticket += 1;
        let ticket = LoadTicket(self.next_ticket);

        if let Some(previous) = self.in_flight.replace(ticket) {
            debug!(?previous, %number, "superseding outstanding route load");
        }
        self.state = LoadState::Loading {
            number: number.clone(),
        };

        PendingLoad {
            ticket,
            number,
            store: self.store.clone(),
        }
    }

    /// Apply the outcome of a request. Returns `false` if the outcome was
    /// stale and has been discarded.
    pub fn apply(&mut self, outcome: LoadOutcome) -> bool {
        if self.in_flight != Some(outcome.ticket) {
            debug!(
                ticket = ?outcome.ticket,
                number = %outcome.number,
                "discarding stale route load"
            );
            return false;
        }
        self.in_flight = None;

        self.state = match outcome.result {
            Ok(details) => {
                info!(number = %outcome.number, stops = details.stops.len(), "route loaded");
                LoadState::Loaded(details)
            }
            Err(error) => match self.dataset.route_details(&outcome.number) {
                Some(details) => {
                    warn!(
                        number = %outcome.number,
                        %error,
                        version = self.dataset.version(),
                        "serving route from fallback dataset"
                    );
                    LoadState::Fallback {
                        details,
                        version: self.dataset.version().to_owned(),
                    }
                }
                None => {
                    warn!(number = %outcome.number, %error, "route not found");
                    LoadState::NotFound {
                        number: outcome.number,
                    }
                }
            },
        };
        true
    }

    /// Request `number` and wait for the result
    pub async fn load(&mut self, number: RouteNumber) -> &LoadState {
        let outcome = self.request(number).fetch().await;
        self.apply(outcome);
        &self.state
    }

    /// Return to `Idle`, ignoring any request still in flight
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.state = LoadState::Idle;
    }
}
