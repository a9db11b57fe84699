//! The lease manager
//!
//! Acquisition is a multi-step sequence over individually-serialized store
//! operations and is not linearizable as a whole; the atomic `spop` of the
//! unlocked set is the arbitration point. Two racing acquisitions on the
//! same class each pop a different board or one of them finds the pool
//! empty. The lock reaper mutates the same keys independently, so any key
//! may change between two of our own reads.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use vlab_store::{keys, Store};

use crate::directory::{board_details, Board};
use crate::error::LeaseError;
use crate::guard::{check_in_set, is_overlord};

/// Maximum lease duration in seconds.
///
/// The lock reaper reclaims boards whose lease is older than this; both
/// sides must agree on the value.
pub const MAX_LEASE_SECS: u64 = 600;

/// TTL of the advisory per-class locking marker written during
/// acquisition. Diagnostic only; nothing reads it.
pub const LOCKING_HINT_TTL: Duration = Duration::from_secs(2);

/// A granted (or refreshed) lease together with the board it covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Granted {
    pub board: Board,
    pub holder: String,
    /// Epoch seconds at acquisition/refresh; `release` must be called with
    /// this exact value
    pub locked_at: i64,
    /// Epoch seconds at which the reaper may reclaim the board
    pub expires_at: i64,
}

/// Brokers exclusive, time-bounded board leases over the injected store
pub struct LeaseManager {
    store: Arc<dyn Store>,
    max_lease: Duration,
}

impl LeaseManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            max_lease: Duration::from_secs(MAX_LEASE_SECS),
        }
    }

    /// Override the maximum lease duration (the reaper must agree)
    pub fn with_max_lease(mut self, max_lease: Duration) -> Self {
        self.max_lease = max_lease;
        self
    }

    pub fn max_lease(&self) -> Duration {
        self.max_lease
    }

    /// Acquire a board of `board_class` for `user`.
    ///
    /// Idempotent per caller: if `user` already holds a board of this
    /// class, that lease's timestamp is refreshed and the same board is
    /// returned; a second board is never allocated. Validation and
    /// permission failures, and an exhausted pool, leave the store
    /// untouched.
    pub async fn acquire(&self, user: &str, board_class: &str) -> Result<Granted, LeaseError> {
        let store = self.store.as_ref();

        check_in_set(store, keys::BOARD_CLASSES, board_class, || {
            LeaseError::UnknownBoardClass {
                class: board_class.to_string(),
            }
        })
        .await?;
        check_in_set(store, keys::USERS, user, || LeaseError::UnknownUser {
            user: user.to_string(),
        })
        .await?;
        if !is_overlord(store, user).await? {
            check_in_set(store, &keys::user_allowed_boards(user), board_class, || {
                LeaseError::PermissionDenied {
                    user: user.to_string(),
                    class: board_class.to_string(),
                }
            })
            .await?;
        }

        let locked_at = Utc::now().timestamp();

        let board_id = match self.owned_board(user, board_class).await? {
            Some(board_id) => {
                // Already ours: refresh the lease timestamp only
                store
                    .set(&keys::board_lock_time(&board_id), &locked_at.to_string())
                    .await?;
                tracing::debug!(user, board_class, board = %board_id, "refreshed existing lease");
                board_id
            }
            None => self.lock_fresh_board(user, board_class, locked_at).await?,
        };

        let remaining = store
            .scard(&keys::class_unlocked_boards(board_class))
            .await?;
        tracing::info!(user, board_class, board = %board_id, remaining, "LOCK");

        let board = board_details(store, board_class, &board_id).await?;
        Ok(Granted {
            board,
            holder: user.to_string(),
            locked_at,
            expires_at: locked_at + self.max_lease.as_secs() as i64,
        })
    }

    /// Find the board of `board_class` already leased to `user`, if any
    pub async fn owned_board(
        &self,
        user: &str,
        board_class: &str,
    ) -> Result<Option<String>, LeaseError> {
        for board in self
            .store
            .smembers(&keys::class_boards(board_class))
            .await?
        {
            let holder = self.store.get(&keys::board_lock_username(&board)).await?;
            if holder.as_deref() == Some(user) {
                return Ok(Some(board));
            }
        }
        Ok(None)
    }

    /// Release `board` back to its class pool.
    ///
    /// Mutates only if the lease is still held by `user` with the exact
    /// `expected_locked_at` timestamp observed at acquisition. Any mismatch
    /// (the reaper reclaimed the board, or someone else now holds it) is a
    /// silent no-op returning `false`; callers must not retry.
    pub async fn release(
        &self,
        board: &str,
        board_class: &str,
        user: &str,
        expected_locked_at: i64,
    ) -> Result<bool, LeaseError> {
        let holder = self.store.get(&keys::board_lock_username(board)).await?;
        if holder.as_deref() != Some(user) {
            return Ok(false);
        }
        let recorded = self
            .store
            .get(&keys::board_lock_time(board))
            .await?
            .and_then(|raw| raw.parse::<i64>().ok());
        if recorded != Some(expected_locked_at) {
            return Ok(false);
        }

        self.store.del(&keys::board_lock_username(board)).await?;
        self.store.del(&keys::board_lock_time(board)).await?;
        self.store
            .sadd(&keys::class_unlocked_boards(board_class), board)
            .await?;
        tracing::info!(user, board_class, board, "RELEASE");
        Ok(true)
    }

    /// Pop a board from the unlocked pool and write its lease.
    async fn lock_fresh_board(
        &self,
        user: &str,
        board_class: &str,
        locked_at: i64,
    ) -> Result<String, LeaseError> {
        let hint_key = keys::class_locking_hint(board_class);
        self.store
            .set_with_ttl(&hint_key, "1", LOCKING_HINT_TTL)
            .await?;

        let unlocked_key = keys::class_unlocked_boards(board_class);
        let Some(board_id) = self.store.spop(&unlocked_key).await? else {
            self.store.del(&hint_key).await?;
            tracing::warn!(user, board_class, "NOFREEBOARDS");
            return Err(LeaseError::NoBoardsAvailable {
                class: board_class.to_string(),
                max_lease: self.max_lease,
            });
        };

        if let Err(err) = self.write_lease(&board_id, user, locked_at).await {
            // The pop must never leak a board: undo any partial lease and
            // put the board back before surfacing the failure.
            self.return_to_pool(&unlocked_key, &board_id).await;
            return Err(err);
        }
        Ok(board_id)
    }

    async fn write_lease(
        &self,
        board: &str,
        user: &str,
        locked_at: i64,
    ) -> Result<(), LeaseError> {
        self.store
            .set(&keys::board_lock_username(board), user)
            .await?;
        self.store
            .set(&keys::board_lock_time(board), &locked_at.to_string())
            .await?;
        Ok(())
    }

    /// Best-effort compensation after a failed lease write. Failures here
    /// are logged, not surfaced; the original error wins.
    async fn return_to_pool(&self, unlocked_key: &str, board: &str) {
        if let Err(err) = self.store.del(&keys::board_lock_username(board)).await {
            tracing::error!(board, error = %err, "failed to clear partial lease holder");
        }
        if let Err(err) = self.store.del(&keys::board_lock_time(board)).await {
            tracing::error!(board, error = %err, "failed to clear partial lease time");
        }
        match self.store.sadd(unlocked_key, board).await {
            Ok(()) => tracing::warn!(board, "returned board to unlocked pool after failed lease write"),
            Err(err) => {
                tracing::error!(board, error = %err, "failed to return board to unlocked pool")
            }
        }
    }
}
