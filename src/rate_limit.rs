// Jaskier Shared Pattern -- rate limiter
// Fixed per-minute window counter per (tenant, credential), backed by the
// fast store's atomic INCR + one-shot EXPIRE.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::GatewayError;
use crate::fast_store::FastStore;

const WINDOW_SECS: u64 = 60;

fn bucket_key(tenant_id: Uuid, credential_id: Uuid, minute: u64) -> String {
    format!("rl:{tenant_id}:{credential_id}:{minute}")
}

pub struct RateLimiter {
    store: Arc<dyn FastStore>,
    requests_per_minute: u32,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn FastStore>, requests_per_minute: u32) -> Self {
        Self {
            store,
            requests_per_minute,
        }
    }

    /// Succeeds silently, or fails `RateLimited` with a 60s retry hint.
    /// If the fast store is unreachable, fails `Unavailable` — never
    /// fail-open.
    pub async fn check(&self, tenant_id: Uuid, credential_id: Uuid) -> Result<(), GatewayError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system clock before epoch")
            .as_secs();
        let minute = now / WINDOW_SECS;
        let key = bucket_key(tenant_id, credential_id, minute);

        let count = self
            .store
            .incr_with_expiry_once(&key, Duration::from_secs(WINDOW_SECS))
            .await
            .map_err(|e| GatewayError::Unavailable(format!("rate limiter store unreachable: {e}")))?;

        if count > self.requests_per_minute as i64 {
            return Err(GatewayError::RateLimited {
                retry_after_secs: WINDOW_SECS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fast_store::InMemoryStore;

    #[tokio::test]
    async fn allows_up_to_threshold_then_rejects() {
        let store = Arc::new(InMemoryStore::new());
        let limiter = RateLimiter::new(store, 10);
        let tenant = Uuid::new_v4();
        let cred = Uuid::new_v4();

        for _ in 0..10 {
            assert!(limiter.check(tenant, cred).await.is_ok());
        }
        let err = limiter.check(tenant, cred).await.unwrap_err();
        match err {
            GatewayError::RateLimited { retry_after_secs } => assert_eq!(retry_after_secs, 60),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn different_credentials_get_independent_buckets() {
        let store = Arc::new(InMemoryStore::new());
        let limiter = RateLimiter::new(store, 1);
        let tenant = Uuid::new_v4();

        assert!(limiter.check(tenant, Uuid::new_v4()).await.is_ok());
        assert!(limiter.check(tenant, Uuid::new_v4()).await.is_ok());
    }
}
