// Jaskier Shared Pattern -- response cache
// Read-through cache over the fast store with a cross-process single-flight
// lock. Keys are fully namespaced by the caller (cache_key::fingerprint
// already returns `cache:<hex>`; the lock key derives from it here).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::fast_store::FastStore;
use crate::metrics::Metrics;

pub struct ResponseCache {
    store: Arc<dyn FastStore>,
    ttl: Duration,
    lock_ttl: Duration,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl ResponseCache {
    pub fn new(
        store: Arc<dyn FastStore>,
        ttl: Duration,
        lock_ttl: Duration,
        poll_interval: Duration,
        poll_attempts: u32,
    ) -> Self {
        Self {
            store,
            ttl,
            lock_ttl,
            poll_interval,
            poll_attempts,
        }
    }

    pub async fn read(&self, fingerprint: &str) -> anyhow::Result<Option<String>> {
        self.store.get(fingerprint).await
    }

    async fn write(&self, fingerprint: &str, value: &str) -> anyhow::Result<()> {
        self.store.set_ex(fingerprint, value, self.ttl).await
    }

    fn lock_key(fingerprint: &str) -> String {
        format!("lock:{}", fingerprint.trim_start_matches("cache:"))
    }

    /// Runs the single-flight protocol for `fingerprint`. On a cache hit,
    /// returns it directly (no cache-miss observation). On a miss, one
    /// caller becomes the leader (runs `produce`, writes the result, then
    /// always releases the lock); everyone else polls briefly and falls
    /// through to producing on their own, unlocked, if the leader doesn't
    /// finish in time.
    pub async fn single_flight<F, Fut>(
        &self,
        fingerprint: &str,
        tenant_label: &str,
        metrics: &Metrics,
        produce: F,
    ) -> anyhow::Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<String>>,
    {
        if let Some(hit) = self.read(fingerprint).await? {
            metrics.cache_hits_total.with_label_values(&[tenant_label]).inc();
            return Ok(hit);
        }
        metrics.cache_misses_total.with_label_values(&[tenant_label]).inc();

        let lock_key = Self::lock_key(fingerprint);
        let acquired = self.store.set_nx_ex(&lock_key, "1", self.lock_ttl).await?;

        if acquired {
            let result = produce().await;
            let outcome = match &result {
                Ok(value) => self.write(fingerprint, value).await,
                Err(_) => Ok(()),
            };
            self.store.del(&lock_key).await?;
            outcome?;
            return result;
        }

        for _ in 0..self.poll_attempts {
            tokio::time::sleep(self.poll_interval).await;
            if let Some(hit) = self.read(fingerprint).await? {
                return Ok(hit);
            }
        }

        produce().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fast_store::InMemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn test_cache(store: Arc<dyn FastStore>) -> ResponseCache {
        ResponseCache::new(
            store,
            Duration::from_secs(300),
            Duration::from_secs(10),
            Duration::from_millis(100),
            20,
        )
    }

    #[tokio::test]
    async fn cache_hit_skips_produce() {
        let store = Arc::new(InMemoryStore::new());
        let cache = test_cache(store.clone());
        let metrics = Metrics::new();

        cache.write("cache:abc", "cached-value").await.unwrap();

        let calls = AtomicU32::new(0);
        let result = cache
            .single_flight("cache:abc", "t1", &metrics, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("fresh-value".to_string())
            })
            .await
            .unwrap();

        assert_eq!(result, "cached-value");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn leader_produces_and_writes_through() {
        let store = Arc::new(InMemoryStore::new());
        let cache = test_cache(store.clone());
        let metrics = Metrics::new();

        let result = cache
            .single_flight("cache:xyz", "t1", &metrics, || async {
                Ok("produced".to_string())
            })
            .await
            .unwrap();

        assert_eq!(result, "produced");
        assert_eq!(cache.read("cache:xyz").await.unwrap().as_deref(), Some("produced"));
        assert_eq!(store.get("lock:xyz").await.unwrap(), None, "lock must be released");
    }

    #[tokio::test]
    async fn failed_producer_releases_lock_without_writing() {
        let store = Arc::new(InMemoryStore::new());
        let cache = test_cache(store.clone());
        let metrics = Metrics::new();

        let result = cache
            .single_flight("cache:err", "t1", &metrics, || async {
                Err::<String, _>(anyhow::anyhow!("upstream exploded"))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(cache.read("cache:err").await.unwrap(), None);
        assert_eq!(store.get("lock:err").await.unwrap(), None, "lock must be released on failure");
    }

    #[tokio::test]
    async fn follower_picks_up_value_once_leader_publishes() {
        let store = Arc::new(InMemoryStore::new());
        store.set_nx_ex("lock:shared", "1", Duration::from_secs(10)).await.unwrap();

        let cache = test_cache(store.clone());
        let metrics = Metrics::new();

        let writer_store = store.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            writer_store.set_ex("cache:shared", "leader-value", Duration::from_secs(60)).await.unwrap();
            writer_store.del("lock:shared").await.unwrap();
        });

        let result = cache
            .single_flight("cache:shared", "t1", &metrics, || async {
                Ok("follower-produced".to_string())
            })
            .await
            .unwrap();

        assert_eq!(result, "leader-value");
    }
}
