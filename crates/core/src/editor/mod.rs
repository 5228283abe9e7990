//! Editing of a route's name and stop list.
//!
//! Edits are applied to a working copy only. The copy is persisted through a
//! [`SaveCoordinator`](save::SaveCoordinator) on commit, or thrown away on
//! discard.

pub mod controller;
pub mod save;

pub use controller::{CommitResolution, CommitTicket, EditableRoute, Mode, StopListEditor};
pub use save::{CommitRequest, SaveCoordinator, SavePolicy, SaveRejected, SaveReport, SaveTarget};

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EditorError {
    #[error("route is not being edited")]
    NotEditing,

    #[error("route is already being edited")]
    AlreadyEditing,

    #[error("a save is already in progress")]
    CommitInProgress,

    #[error("no route is loaded")]
    NothingLoaded,
}
