use serde::{Deserialize, Serialize};

// ── DB row types ────────────────────────────────────────────────────────

/// A row from `credentials`. `revoked_at.is_none()` ⇔ active.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CredentialRow {
    pub id: uuid::Uuid,
    pub tenant_id: uuid::Uuid,
    pub key_hash: String,
    pub label: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub revoked_at: Option<chrono::DateTime<chrono::Utc>>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
}

// ── Auth ────────────────────────────────────────────────────────────────

/// Ephemeral, per-request. Immutable after construction.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub tenant_id: uuid::Uuid,
    pub credential_id: uuid::Uuid,
}

// ── Predict API ─────────────────────────────────────────────────────────

fn default_model() -> String {
    "dummy-model".to_string()
}

fn default_max_tokens() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictRequest {
    pub prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub cache_bypass: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub output: String,
}

// ── Health ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub db: bool,
    pub redis: bool,
}
