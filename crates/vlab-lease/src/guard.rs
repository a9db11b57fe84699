//! Directory guard helpers
//!
//! Uniform fail-fast membership checks run before any acquisition step
//! mutates the store, so validation failures never leave side effects.

use vlab_store::{keys, Store};

use crate::error::LeaseError;

/// Fail with `on_missing()` unless `member` is in the set at `set_key`.
///
/// Never mutates the store.
pub async fn check_in_set<F>(
    store: &dyn Store,
    set_key: &str,
    member: &str,
    on_missing: F,
) -> Result<(), LeaseError>
where
    F: FnOnce() -> LeaseError,
{
    if store.sismember(set_key, member).await? {
        Ok(())
    } else {
        Err(on_missing())
    }
}

/// Whether the user may acquire any board class
pub async fn is_overlord(store: &dyn Store, user: &str) -> Result<bool, LeaseError> {
    let flag = store.get(&keys::user_overlord(user)).await?;
    Ok(flag.as_deref() == Some("true"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use vlab_store::MemoryStore;

    #[tokio::test]
    async fn check_in_set_passes_members_and_fails_strangers() {
        let store = Arc::new(MemoryStore::new());
        store.sadd(keys::USERS, "alice").await.unwrap();

        check_in_set(store.as_ref(), keys::USERS, "alice", || {
            LeaseError::UnknownUser {
                user: "alice".to_string(),
            }
        })
        .await
        .unwrap();

        let err = check_in_set(store.as_ref(), keys::USERS, "mallory", || {
            LeaseError::UnknownUser {
                user: "mallory".to_string(),
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, LeaseError::UnknownUser { .. }));
    }

    #[tokio::test]
    async fn overlord_requires_the_literal_true() {
        let store = MemoryStore::new();
        assert!(!is_overlord(&store, "alice").await.unwrap());

        store
            .set(&keys::user_overlord("alice"), "true")
            .await
            .unwrap();
        assert!(is_overlord(&store, "alice").await.unwrap());

        store.set(&keys::user_overlord("bob"), "yes").await.unwrap();
        assert!(!is_overlord(&store, "bob").await.unwrap());
    }
}
