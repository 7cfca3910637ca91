use async_trait::async_trait;
use uuid::Uuid;

use super::Backend;

/// Local/dummy backend: deterministic, never fails, optionally sleeps a
/// touch to simulate real latency. Anchors tests — the exact output shape
/// is relied on by integration tests, so changing it is a breaking change.
pub struct DummyBackend;

#[async_trait]
impl Backend for DummyBackend {
    async fn predict(
        &self,
        tenant_id: Uuid,
        prompt: &str,
        _model: &str,
        _temperature: f64,
        _max_tokens: u32,
    ) -> anyhow::Result<String> {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        Ok(format!("[tenant={tenant_id}] echo: {prompt}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echoes_prompt_with_tenant_prefix() {
        let tenant = Uuid::new_v4();
        let out = DummyBackend
            .predict(tenant, "hello", "dummy-model", 0.0, 100)
            .await
            .unwrap();
        assert_eq!(out, format!("[tenant={tenant}] echo: hello"));
    }
}
