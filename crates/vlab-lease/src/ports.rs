//! Ephemeral port allocation for tunnel multiplexing

use std::sync::Arc;

use vlab_store::{keys, Store, StoreError};

use crate::error::LeaseError;

/// First port handed out after a wrap
pub const PORT_FLOOR: u16 = 30000;
/// Highest port handed out before wrapping
pub const PORT_CEILING: u16 = 35000;

/// Hands out wrapping ephemeral ports from the shared counter
pub struct PortAllocator {
    store: Arc<dyn Store>,
}

impl PortAllocator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Next port in [30000, 35000], wrapping back to 30000 past the top.
    ///
    /// The increment and wrap check ride inside the store's single atomic
    /// unit, so concurrent callers always receive distinct ports.
    pub async fn next_port(&self) -> Result<u16, LeaseError> {
        let value = self
            .store
            .incr_wrap(
                keys::EPHEMERAL_PORT,
                i64::from(PORT_FLOOR),
                i64::from(PORT_CEILING),
            )
            .await?;
        u16::try_from(value).map_err(|_| {
            LeaseError::Store(StoreError::Corrupt {
                key: keys::EPHEMERAL_PORT.to_string(),
                reason: format!("port counter out of range: {value}"),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vlab_store::MemoryStore;

    #[tokio::test]
    async fn ports_wrap_at_the_ceiling() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(keys::EPHEMERAL_PORT, "34999")
            .await
            .unwrap();

        let allocator = PortAllocator::new(store);
        assert_eq!(allocator.next_port().await.unwrap(), 35000);
        assert_eq!(allocator.next_port().await.unwrap(), 30000);
        assert_eq!(allocator.next_port().await.unwrap(), 30001);
    }

    #[tokio::test]
    async fn consecutive_ports_are_distinct() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(keys::EPHEMERAL_PORT, &PORT_FLOOR.to_string())
            .await
            .unwrap();

        let allocator = PortAllocator::new(store);
        let first = allocator.next_port().await.unwrap();
        let second = allocator.next_port().await.unwrap();
        assert_ne!(first, second);
    }
}
