//! Board leasing for the VLAB relay
//!
//! Implements the reservation protocol over the shared coordination store:
//! acquiring a board from a class pool, idempotently re-acquiring one's own
//! lease, releasing it with a matched-timestamp guard, and the ephemeral
//! port counter used to multiplex SSH tunnels.
//!
//! Nothing here holds in-process state across invocations; the injected
//! [`Store`](vlab_store::Store) is the single source of truth, shared with
//! the lock reaper and every other concurrent relay invocation.

mod directory;
mod error;
mod guard;
mod manager;
mod ports;

pub use directory::{board_details, Board};
pub use error::LeaseError;
pub use guard::{check_in_set, is_overlord};
pub use manager::{Granted, LeaseManager, LOCKING_HINT_TTL, MAX_LEASE_SECS};
pub use ports::{PortAllocator, PORT_CEILING, PORT_FLOOR};
