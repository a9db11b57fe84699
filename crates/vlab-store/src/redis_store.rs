//! Redis store backend
//!
//! The production coordination store. One multiplexed connection serves the
//! whole invocation; the relay is started alongside the Redis container, so
//! the initial connection retries for a bounded window before giving up.

use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};

use crate::store::{Store, StoreError, StoreResult};

/// Attempts made to reach the store before failing the invocation
const CONNECT_ATTEMPTS: u32 = 5;
/// Delay between connection attempts
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// INCR with the wrap check inside one script invocation, so two callers
/// can never observe the same counter value
const INCR_WRAP_SCRIPT: &str = r#"
local v = redis.call('INCR', KEYS[1])
if v > tonumber(ARGV[1]) then
    redis.call('SET', KEYS[1], ARGV[2])
    return tonumber(ARGV[2])
end
return v
"#;

/// Redis-backed `Store` implementation
pub struct RedisStore {
    conn: MultiplexedConnection,
    incr_wrap: Script,
}

impl RedisStore {
    /// Connect to the store at `url`, retrying for a bounded window
    pub async fn connect(url: &str) -> StoreResult<Self> {
        Self::connect_with_retry(url, CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY).await
    }

    /// Connect with an explicit retry budget
    pub async fn connect_with_retry(
        url: &str,
        attempts: u32,
        retry_delay: Duration,
    ) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match client.get_multiplexed_async_connection().await {
                Ok(mut conn) => {
                    let pong: Result<String, redis::RedisError> =
                        redis::cmd("PING").query_async(&mut conn).await;
                    match pong {
                        Ok(_) => {
                            tracing::debug!(url, attempt, "connected to coordination store");
                            return Ok(Self {
                                conn,
                                incr_wrap: Script::new(INCR_WRAP_SCRIPT),
                            });
                        }
                        Err(err) => last_error = err.to_string(),
                    }
                }
                Err(err) => last_error = err.to_string(),
            }
            tracing::warn!(
                url,
                attempt,
                max_attempts = attempts,
                error = %last_error,
                "connection to coordination store failed, retrying"
            );
            if attempt < attempts {
                tokio::time::sleep(retry_delay).await;
            }
        }
        Err(StoreError::Unavailable {
            attempts,
            detail: last_error,
        })
    }
}

#[async_trait::async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs().max(1)).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(key, member).await?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.srem(key, member).await?;
        Ok(())
    }

    async fn spop(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.spop(key).await?)
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.sismember(key, member).await?)
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(key).await?)
    }

    async fn scard(&self, key: &str) -> StoreResult<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.scard(key).await?)
    }

    async fn incr_wrap(&self, key: &str, floor: i64, ceiling: i64) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = self
            .incr_wrap
            .key(key)
            .arg(ceiling)
            .arg(floor)
            .invoke_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
