// Jaskier Shared Pattern -- backend router
// Picks a backend by model prefix, gates the call through that provider's
// circuit breaker, and constructs remote backends lazily (guarded, so two
// concurrent requests never race to build two clients).

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backends::{self, Backend, GeminiBackend, OpenAiBackend};
use crate::breaker::CircuitBreaker;
use crate::config::Config;
use crate::error::GatewayError;
use crate::metrics::Metrics;

struct LazyBackend {
    backend: Mutex<Option<Arc<dyn Backend>>>,
}

impl LazyBackend {
    fn empty() -> Self {
        Self {
            backend: Mutex::new(None),
        }
    }

    async fn get_or_init<F>(&self, init: F) -> Arc<dyn Backend>
    where
        F: FnOnce() -> Arc<dyn Backend>,
    {
        let mut guard = self.backend.lock().await;
        if let Some(existing) = guard.as_ref() {
            return existing.clone();
        }
        let created = init();
        *guard = Some(created.clone());
        created
    }
}

pub struct RouteDecision {
    pub backend: Arc<dyn Backend>,
    pub provider: &'static str,
    /// Present when a fallback exists (local, for remote providers). The
    /// router never invokes it itself — spec fixes breaker-open as a plain
    /// 503, not an automatic fallback dispatch.
    pub fallback: Option<Arc<dyn Backend>>,
}

pub struct BackendRouter {
    config: Config,
    http_client: reqwest::Client,
    local: Arc<dyn Backend>,
    openai: LazyBackend,
    gemini: LazyBackend,
    pub openai_breaker: Arc<CircuitBreaker>,
    pub gemini_breaker: Arc<CircuitBreaker>,
    pub local_breaker: Arc<CircuitBreaker>,
}

impl BackendRouter {
    pub fn new(config: Config, http_client: reqwest::Client) -> anyhow::Result<Self> {
        let local = backends::build_local(&config.inference_backend)?;

        let openai_breaker = Arc::new(CircuitBreaker::new(
            config.remote_breaker_threshold,
            config.remote_breaker_cooldown,
        ));
        let gemini_breaker = Arc::new(CircuitBreaker::new(
            config.remote_breaker_threshold,
            config.remote_breaker_cooldown,
        ));
        let local_breaker = Arc::new(CircuitBreaker::new(
            config.local_breaker_threshold,
            config.local_breaker_cooldown,
        ));

        Ok(Self {
            config,
            http_client,
            local,
            openai: LazyBackend::empty(),
            gemini: LazyBackend::empty(),
            openai_breaker,
            gemini_breaker,
            local_breaker,
        })
    }

    /// `route(model)` — pick the backend, check its breaker, and fail
    /// `ServiceUnavailable` (tracked via `provider_rejections_total`) if
    /// it's open. No automatic fallback dispatch here by design (§9).
    pub async fn route(&self, model: &str, metrics: &Metrics) -> Result<RouteDecision, GatewayError> {
        let (backend, breaker, provider, fallback): (Arc<dyn Backend>, &CircuitBreaker, &'static str, Option<Arc<dyn Backend>>) =
            if let Some(stripped) = model.strip_prefix("gpt-") {
                let _ = stripped;
                let backend = self
                    .openai
                    .get_or_init(|| {
                        let key = self.config.openai_api_key.clone().unwrap_or_default();
                        Arc::new(OpenAiBackend::new(key, self.http_client.clone())) as Arc<dyn Backend>
                    })
                    .await;
                (backend, &self.openai_breaker, "openai", Some(self.local.clone()))
            } else if model.starts_with("gemini-") {
                let backend = self
                    .gemini
                    .get_or_init(|| {
                        let key = self.config.gemini_api_key.clone().unwrap_or_default();
                        Arc::new(GeminiBackend::new(key, self.http_client.clone())) as Arc<dyn Backend>
                    })
                    .await;
                (backend, &self.gemini_breaker, "gemini", Some(self.local.clone()))
            } else {
                (self.local.clone(), &self.local_breaker, "local", None)
            };

        if !breaker.allow().await {
            metrics.provider_rejections.with_label_values(&[provider]).inc();
            return Err(GatewayError::BreakerOpen {
                provider: provider.to_string(),
            });
        }

        Ok(RouteDecision {
            backend,
            provider,
            fallback,
        })
    }

    pub fn breaker_for(&self, provider: &str) -> &CircuitBreaker {
        match provider {
            "openai" => &self.openai_breaker,
            "gemini" => &self.gemini_breaker,
            _ => &self.local_breaker,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            redis_url: String::new(),
            api_key_pepper: "pepper".to_string(),
            inference_backend: "dummy".to_string(),
            openai_api_key: None,
            gemini_api_key: None,
            rate_limit_per_minute: 10,
            cache_ttl: Duration::from_secs(300),
            lock_ttl: Duration::from_secs(10),
            single_flight_poll_interval: Duration::from_millis(100),
            single_flight_poll_attempts: 20,
            remote_breaker_threshold: 3,
            remote_breaker_cooldown: Duration::from_secs(60),
            local_breaker_threshold: 5,
            local_breaker_cooldown: Duration::from_secs(30),
            port: 0,
        }
    }

    #[tokio::test]
    async fn routes_by_model_prefix() {
        let router = BackendRouter::new(test_config(), reqwest::Client::new()).unwrap();
        let metrics = Metrics::new();

        let local = router.route("dummy-model", &metrics).await.unwrap();
        assert_eq!(local.provider, "local");
        assert!(local.fallback.is_none());

        let openai = router.route("gpt-4", &metrics).await.unwrap();
        assert_eq!(openai.provider, "openai");
        assert!(openai.fallback.is_some());

        let gemini = router.route("gemini-pro", &metrics).await.unwrap();
        assert_eq!(gemini.provider, "gemini");
        assert!(gemini.fallback.is_some());
    }

    #[tokio::test]
    async fn rejects_with_503_when_breaker_open() {
        let router = BackendRouter::new(test_config(), reqwest::Client::new()).unwrap();
        let metrics = Metrics::new();

        for _ in 0..3 {
            router.openai_breaker.on_failure().await;
        }

        let err = router.route("gpt-4", &metrics).await.unwrap_err();
        match err {
            GatewayError::BreakerOpen { provider } => assert_eq!(provider, "openai"),
            other => panic!("expected BreakerOpen, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_inference_backend_fails_construction() {
        let mut config = test_config();
        config.inference_backend = "not-a-real-backend".to_string();

        let err = BackendRouter::new(config, reqwest::Client::new()).unwrap_err();
        assert!(err.to_string().contains("not-a-real-backend"));
    }
}
