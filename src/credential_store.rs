// Jaskier Shared Pattern -- credential store
// Durable-store adapter: look up active credentials by hash, touch
// last_used_at. Read-mostly; the one write per request is best-effort.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::CredentialRow;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch an active (non-revoked) credential by its pepper-HMAC hash.
    async fn find_active_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<CredentialRow>>;

    /// Best-effort touch of `last_used_at`. Failure here must not fail the
    /// request — callers log and continue.
    async fn touch_last_used(&self, credential_id: Uuid) -> anyhow::Result<()>;

    /// Liveness probe for `/readyz`.
    async fn ping(&self) -> bool;
}

// ── Postgres-backed implementation ──────────────────────────────────────

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_active_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<CredentialRow>> {
        let row = sqlx::query_as::<_, CredentialRow>(concat!(
            "SELECT id, tenant_id, key_hash, label, created_at, revoked_at, last_used_at ",
            "FROM credentials WHERE key_hash = $1 AND revoked_at IS NULL",
        ))
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn touch_last_used(&self, credential_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("UPDATE credentials SET last_used_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(credential_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// ── In-memory test double ───────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    credentials: Arc<Mutex<HashMap<String, CredentialRow>>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an active credential for a given tenant, returning its id.
    pub async fn insert(&self, key_hash: &str, tenant_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        let row = CredentialRow {
            id,
            tenant_id,
            key_hash: key_hash.to_string(),
            label: None,
            created_at: Utc::now(),
            revoked_at: None,
            last_used_at: None,
        };
        self.credentials.lock().await.insert(key_hash.to_string(), row);
        id
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_active_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<CredentialRow>> {
        let map = self.credentials.lock().await;
        Ok(map.get(key_hash).filter(|c| c.revoked_at.is_none()).cloned())
    }

    async fn touch_last_used(&self, credential_id: Uuid) -> anyhow::Result<()> {
        let mut map = self.credentials.lock().await;
        if let Some(row) = map.values_mut().find(|c| c.id == credential_id) {
            row.last_used_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}
