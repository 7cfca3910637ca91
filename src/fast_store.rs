// Jaskier Shared Pattern -- fast store
// Thin adapter over the shared in-memory store. Only the primitive ops the
// rest of the gateway needs: atomic increment-with-ttl, NX-locking SET, and
// plain get/set/del. Namespacing (`cache:`, `lock:`, `rl:`) is the caller's
// responsibility — this layer is prefix-agnostic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[async_trait]
pub trait FastStore: Send + Sync {
    /// `INCR key`; if this is the first increment (result == 1), also sets
    /// a TTL on the key. Returns the post-increment count.
    async fn incr_with_expiry_once(&self, key: &str, ttl: Duration) -> anyhow::Result<i64>;

    /// `SET key value NX EX ttl`. Returns `true` if the key was set (lock
    /// acquired), `false` if it already existed.
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool>;

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>>;

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()>;

    async fn del(&self, key: &str) -> anyhow::Result<()>;

    /// Liveness probe for `/readyz`.
    async fn ping(&self) -> bool;
}

// ── Redis-backed implementation ─────────────────────────────────────────

pub struct RedisStore {
    manager: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl FastStore for RedisStore {
    async fn incr_with_expiry_once(&self, key: &str, ttl: Duration) -> anyhow::Result<i64> {
        use redis::AsyncCommands;
        let mut conn = self.manager.clone();
        let count: i64 = conn.incr(key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(key, ttl.as_secs() as i64).await?;
        }
        Ok(count)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool> {
        use redis::AsyncCommands;
        let mut conn = self.manager.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs())
            .query_async(&mut conn)
            .await?;
        Ok(result.is_some())
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        use redis::AsyncCommands;
        let mut conn = self.manager.clone();
        Ok(conn.get(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.manager.clone();
        let _: () = conn.set_ex(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.manager.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }

    async fn ping(&self) -> bool {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .is_ok()
    }
}

// ── In-memory test double ───────────────────────────────────────────────

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// Single-process stand-in for Redis, used by tests that exercise the rate
/// limiter, cache, and single-flight logic without a live Redis instance.
/// Expiry is checked lazily on read, same externally-observable behavior as
/// a real TTL store.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry) -> bool {
        match entry.expires_at {
            Some(t) => Instant::now() < t,
            None => true,
        }
    }
}

#[async_trait]
impl FastStore for InMemoryStore {
    async fn incr_with_expiry_once(&self, key: &str, ttl: Duration) -> anyhow::Result<i64> {
        let mut map = self.entries.lock().await;
        let is_first = match map.get(key) {
            Some(e) if Self::is_live(e) => false,
            _ => true,
        };
        let count = if is_first {
            1
        } else {
            map.get(key).unwrap().value.parse::<i64>().unwrap_or(0) + 1
        };
        let expires_at = if is_first {
            Some(Instant::now() + ttl)
        } else {
            map.get(key).and_then(|e| e.expires_at)
        };
        map.insert(
            key.to_string(),
            Entry {
                value: count.to_string(),
                expires_at,
            },
        );
        Ok(count)
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<bool> {
        let mut map = self.entries.lock().await;
        if let Some(e) = map.get(key) {
            if Self::is_live(e) {
                return Ok(false);
            }
        }
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut map = self.entries.lock().await;
        match map.get(key) {
            Some(e) if Self::is_live(e) => Ok(Some(e.value.clone())),
            Some(_) => {
                map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> anyhow::Result<()> {
        let mut map = self.entries.lock().await;
        map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn del(&self, key: &str) -> anyhow::Result<()> {
        let mut map = self.entries.lock().await;
        map.remove(key);
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn incr_sets_ttl_only_on_first_hit() {
        let store = InMemoryStore::new();
        assert_eq!(store.incr_with_expiry_once("rl:a", Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(store.incr_with_expiry_once("rl:a", Duration::from_secs(60)).await.unwrap(), 2);
        assert_eq!(store.incr_with_expiry_once("rl:a", Duration::from_secs(60)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn set_nx_ex_is_exclusive() {
        let store = InMemoryStore::new();
        assert!(store.set_nx_ex("lock:a", "1", Duration::from_secs(10)).await.unwrap());
        assert!(!store.set_nx_ex("lock:a", "1", Duration::from_secs(10)).await.unwrap());
        store.del("lock:a").await.unwrap();
        assert!(store.set_nx_ex("lock:a", "1", Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn get_set_roundtrip() {
        let store = InMemoryStore::new();
        assert_eq!(store.get("cache:a").await.unwrap(), None);
        store.set_ex("cache:a", "hello", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.get("cache:a").await.unwrap(), Some("hello".to_string()));
    }
}
