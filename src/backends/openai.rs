use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::Backend;

/// OpenAI-style backend. Constructed lazily by the router on first use so
/// a missing `OPENAI_API_KEY` doesn't crash the process at startup.
pub struct OpenAiBackend {
    api_key: String,
    http_client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: String, http_client: reqwest::Client) -> Self {
        Self { api_key, http_client }
    }
}

#[async_trait]
impl Backend for OpenAiBackend {
    async fn predict(
        &self,
        _tenant_id: Uuid,
        prompt: &str,
        model: &str,
        temperature: f64,
        max_tokens: u32,
    ) -> anyhow::Result<String> {
        let body = json!({
            "model": model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        let response = self
            .http_client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: serde_json::Value = response.json().await?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("OpenAI response missing choices[0].message.content"))?;

        Ok(content.to_string())
    }
}
