// Jaskier Shared Pattern -- backend adapters
// Uniform `predict` contract over heterogeneous upstream providers. No
// inheritance, no dynamic registry — a single async trait, boxed behind an
// `Arc<dyn Backend>` where the router needs to pick one at runtime.

mod dummy;
mod gemini;
mod openai;

pub use dummy::DummyBackend;
pub use gemini::GeminiBackend;
pub use openai::OpenAiBackend;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

/// Identical across providers so the router stays trivial. `tenant_id` is
/// part of the contract (not just a local-backend quirk) so every adapter
/// sees the same shape even though only the local/dummy variant uses it.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn predict(
        &self,
        tenant_id: Uuid,
        prompt: &str,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<String>;
}

/// `INFERENCE_BACKEND` factory — picks the local-slot backend by name.
/// `dummy` is the only local variant today; any other value is a startup
/// error rather than a silent fallback.
pub fn build_local(name: &str) -> anyhow::Result<Arc<dyn Backend>> {
    match name {
        "dummy" => Ok(Arc::new(DummyBackend)),
        other => Err(anyhow::anyhow!("unsupported INFERENCE_BACKEND: {other}")),
    }
}
