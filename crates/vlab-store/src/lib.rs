//! Coordination-store abstraction for the VLAB relay
//!
//! All cross-invocation state (the user/board directory, leases, the
//! ephemeral port counter) lives in a shared key-value store. This crate
//! defines the `Store` trait the rest of the system is written against,
//! the Redis backend used in production, and an in-memory backend for tests.

pub mod keys;
mod memory;
mod redis_store;
mod store;

pub use memory::{MemorySnapshot, MemoryStore};
pub use redis_store::RedisStore;
pub use store::{Store, StoreError, StoreResult};

// Re-export for downstream Store implementations
pub use async_trait::async_trait;
