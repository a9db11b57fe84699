//! The `Store` trait and its error type
//!
//! The store serializes each individual operation, but nothing beyond that:
//! callers must not assume cross-key transactions. The reaper and other
//! relay invocations mutate the same keys concurrently.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from coordination-store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached within the bounded retry budget
    #[error("coordination store unavailable after {attempts} attempts: {detail}")]
    Unavailable { attempts: u32, detail: String },

    /// The backend rejected or failed an operation
    #[error("store backend error: {0}")]
    Backend(#[from] redis::RedisError),

    /// A stored value could not be interpreted
    #[error("corrupt value at {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Key-value primitives the lease protocol is built on
///
/// Implementations must serialize each method call individually: `spop`
/// hands any given member to exactly one caller, and `incr_wrap` is a
/// single read-modify-write unit. No method spans more than one key.
#[async_trait]
pub trait Store: Send + Sync {
    /// Read a string key. Absent keys are `None`.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a string key.
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Write a string key that expires after `ttl`.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> StoreResult<()>;

    /// Add a member to a set.
    async fn sadd(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Remove a member from a set.
    async fn srem(&self, key: &str, member: &str) -> StoreResult<()>;

    /// Atomically remove and return an arbitrary member, or `None` if the
    /// set is empty. This is the arbitration point of board acquisition.
    async fn spop(&self, key: &str) -> StoreResult<Option<String>>;

    /// Test set membership.
    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// List all members of a set.
    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;

    /// Count the members of a set.
    async fn scard(&self, key: &str) -> StoreResult<u64>;

    /// Atomically increment a counter; if the result exceeds `ceiling`,
    /// reset the counter to `floor` and return `floor`. The increment and
    /// the wrap check are one unit: two concurrent callers can never
    /// observe the same value.
    async fn incr_wrap(&self, key: &str, floor: i64, ceiling: i64) -> StoreResult<i64>;

    /// Probe that the store is reachable.
    async fn ping(&self) -> StoreResult<()>;
}
