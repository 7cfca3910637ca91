use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use super::Backend;

/// Gemini-style backend. Constructed lazily by the router on first use so
/// a missing `GEMINI_API_KEY` doesn't crash the process at startup.
pub struct GeminiBackend {
    api_key: String,
    http_client: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(api_key: String, http_client: reqwest::Client) -> Self {
        Self { api_key, http_client }
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn predict(
        &self,
        _tenant_id: Uuid,
        prompt: &str,
        model: &str,
        _temperature: f64,
        _max_tokens: u32,
    ) -> anyhow::Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{model}:generateContent?key={}",
            self.api_key
        );
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
        });

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let payload: serde_json::Value = response.json().await?;
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Gemini response missing candidates[0].content.parts[0].text"))?;

        Ok(text.to_string())
    }
}
