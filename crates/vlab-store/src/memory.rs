//! In-memory store backend
//!
//! A mutex-guarded map standing in for Redis in tests and local
//! experiments. Semantics mirror the real backend where the lease protocol
//! depends on them: `spop` removes exactly one member, empty sets vanish,
//! TTL'd strings expire (checked lazily on read), and `incr_wrap` runs
//! under a single lock hold.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::store::{Store, StoreError, StoreResult};

#[derive(Debug, Clone)]
struct StringEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl StringEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    strings: HashMap<String, StringEntry>,
    sets: HashMap<String, BTreeSet<String>>,
}

/// In-memory `Store` implementation
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

/// A point-in-time copy of the store's durable keys, used by tests to
/// assert that an operation left the store untouched.
///
/// Keys written with a TTL are excluded: they expire on their own
/// schedule, so their presence says nothing about what an operation
/// mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub strings: BTreeMap<String, String>,
    pub sets: BTreeMap<String, BTreeSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out all durable (non-TTL) keys
    pub fn snapshot(&self) -> MemorySnapshot {
        let state = self.state.lock().unwrap();
        MemorySnapshot {
            strings: state
                .strings
                .iter()
                .filter(|(_, entry)| entry.expires_at.is_none())
                .map(|(key, entry)| (key.clone(), entry.value.clone()))
                .collect(),
            sets: state
                .sets
                .iter()
                .map(|(key, members)| (key.clone(), members.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        let expired = match state.strings.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => return Ok(Some(entry.value.clone())),
        };
        if expired {
            state.strings.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.strings.insert(
            key.to_string(),
            StringEntry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.strings.insert(
            key.to_string(),
            StringEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state.strings.remove(key);
        state.sets.remove(key);
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        state
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(members) = state.sets.get_mut(key) {
            members.remove(member);
            if members.is_empty() {
                state.sets.remove(key);
            }
        }
        Ok(())
    }

    async fn spop(&self, key: &str) -> StoreResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        let Some(members) = state.sets.get_mut(key) else {
            return Ok(None);
        };
        // Deterministic pop keeps test fixtures predictable
        let popped = members.iter().next().cloned();
        if let Some(member) = &popped {
            members.remove(member);
            if members.is_empty() {
                state.sets.remove(key);
            }
        }
        Ok(popped)
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sets
            .get(key)
            .is_some_and(|members| members.contains(member)))
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .sets
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn scard(&self, key: &str) -> StoreResult<u64> {
        let state = self.state.lock().unwrap();
        Ok(state.sets.get(key).map(|members| members.len() as u64).unwrap_or(0))
    }

    async fn incr_wrap(&self, key: &str, floor: i64, ceiling: i64) -> StoreResult<i64> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        let current = match state.strings.get(key) {
            Some(entry) if !entry.is_expired(now) => {
                entry.value.parse::<i64>().map_err(|_| StoreError::Corrupt {
                    key: key.to_string(),
                    reason: format!("counter holds non-integer value '{}'", entry.value),
                })?
            }
            _ => 0,
        };
        let mut next = current + 1;
        if next > ceiling {
            next = floor;
        }
        state.strings.insert(
            key.to_string(),
            StringEntry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del_round_trip() {
        let store = MemoryStore::new();
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn ttl_entries_expire() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("hint", "1", Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(store.get("hint").await.unwrap(), Some("1".to_string()));
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(store.get("hint").await.unwrap(), None);
        assert!(store.snapshot().strings.is_empty());
    }

    #[tokio::test]
    async fn spop_removes_exactly_one_member() {
        let store = MemoryStore::new();
        store.sadd("pool", "a").await.unwrap();
        store.sadd("pool", "b").await.unwrap();

        let first = store.spop("pool").await.unwrap().unwrap();
        assert!(!store.sismember("pool", &first).await.unwrap());
        assert_eq!(store.scard("pool").await.unwrap(), 1);

        let second = store.spop("pool").await.unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(store.spop("pool").await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_sets_disappear() {
        let store = MemoryStore::new();
        store.sadd("pool", "a").await.unwrap();
        store.srem("pool", "a").await.unwrap();
        assert!(store.snapshot().sets.is_empty());
    }

    #[tokio::test]
    async fn incr_wrap_wraps_past_the_ceiling() {
        let store = MemoryStore::new();
        store.set("counter", "34999").await.unwrap();
        assert_eq!(store.incr_wrap("counter", 30000, 35000).await.unwrap(), 35000);
        assert_eq!(store.incr_wrap("counter", 30000, 35000).await.unwrap(), 30000);
        assert_eq!(store.incr_wrap("counter", 30000, 35000).await.unwrap(), 30001);
    }

    #[tokio::test]
    async fn incr_wrap_rejects_non_integer_counter() {
        let store = MemoryStore::new();
        store.set("counter", "soup").await.unwrap();
        assert!(matches!(
            store.incr_wrap("counter", 30000, 35000).await,
            Err(StoreError::Corrupt { .. })
        ));
    }
}
