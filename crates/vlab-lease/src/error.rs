//! Error taxonomy for the lease protocol
//!
//! Every variant's message is the single diagnostic line shown to the
//! connecting user. Validation, permission, and exhaustion failures are
//! guaranteed mutation-free; a conflicting release is not an error at all
//! (it is the `false` return of [`LeaseManager::release`]).
//!
//! [`LeaseManager::release`]: crate::LeaseManager::release

use std::time::Duration;

use thiserror::Error;
use vlab_store::StoreError;

#[derive(Debug, Error)]
pub enum LeaseError {
    /// The requested board class is not in the directory
    #[error("Board class {class} does not exist.")]
    UnknownBoardClass { class: String },

    /// The requesting account is not a VLAB user
    #[error("User {user} is not a VLAB user.")]
    UnknownUser { user: String },

    /// The user exists but is not entitled to this board class
    #[error("User {user} cannot access board class {class}.")]
    PermissionDenied { user: String, class: String },

    /// Every board of the class is currently leased
    #[error(
        "All boards of type '{}' are currently locked by other VLAB users. \
         Try again in a few minutes (locks expire after {} minutes).",
        .class,
        .max_lease.as_secs() / 60
    )]
    NoBoardsAvailable { class: String, max_lease: Duration },

    /// The board's directory record is missing or unusable
    #[error("Board {board} has a corrupt directory record: {detail}")]
    CorruptBoardRecord { board: String, detail: String },

    /// The coordination store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
