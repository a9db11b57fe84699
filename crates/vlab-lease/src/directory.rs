//! Read-mostly directory accessors
//!
//! User, class, and board records are bulk-loaded by the relay's startup
//! provisioning (not this crate) and only read here.

use vlab_store::{keys, Store};

use crate::error::LeaseError;

/// A physical board's connection descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub id: String,
    pub board_class: String,
    /// Board server the board hangs off
    pub server: String,
    /// SSH port of the board's container on that server
    pub ssh_port: u16,
    /// Console account inside the container
    pub console_user: String,
    /// Whether the board supports a post-session hardware reset
    pub reset_capable: bool,
}

/// Load a board's connection descriptor from the store.
///
/// The server/port/user keys are written by the board servers when a board
/// registers; a granted board without them is unusable, so their absence is
/// a corrupt record rather than a plain miss.
pub async fn board_details(
    store: &dyn Store,
    board_class: &str,
    board: &str,
) -> Result<Board, LeaseError> {
    let server = require(store, &keys::board_server(board), board, "server").await?;
    let port_raw = require(store, &keys::board_port(board), board, "port").await?;
    let console_user = require(store, &keys::board_user(board), board, "user").await?;

    let ssh_port = port_raw
        .parse()
        .map_err(|_| LeaseError::CorruptBoardRecord {
            board: board.to_string(),
            detail: format!("unparseable ssh port '{port_raw}'"),
        })?;

    let reset_flag = store.get(&keys::knownboard_reset(board)).await?;

    Ok(Board {
        id: board.to_string(),
        board_class: board_class.to_string(),
        server,
        ssh_port,
        console_user,
        reset_capable: reset_flag.as_deref() == Some("true"),
    })
}

async fn require(
    store: &dyn Store,
    key: &str,
    board: &str,
    field: &str,
) -> Result<String, LeaseError> {
    store
        .get(key)
        .await?
        .ok_or_else(|| LeaseError::CorruptBoardRecord {
            board: board.to_string(),
            detail: format!("missing {field}"),
        })
}
