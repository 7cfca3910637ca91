// Jaskier Shared Pattern -- state
// Central application state, assembled once at startup and cloned cheaply
// into every handler (PgPool and Arc<dyn Trait> are both Clone).

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::credential_store::{CredentialStore, PgCredentialStore};
use crate::fast_store::{FastStore, RedisStore};
use crate::metrics::Metrics;
use crate::rate_limit::RateLimiter;
use crate::response_cache::ResponseCache;
use crate::router::BackendRouter;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub credential_store: Arc<dyn CredentialStore>,
    pub fast_store: Arc<dyn FastStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub response_cache: Arc<ResponseCache>,
    pub router: Arc<BackendRouter>,
    pub metrics: Arc<Metrics>,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .timeout(std::time::Duration::from_secs(30))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .idle_timeout(std::time::Duration::from_secs(600))
            .connect(&config.database_url)
            .await?;

        if let Err(e) = sqlx::migrate!("./migrations").run(&pool).await {
            tracing::warn!("migration run skipped or failed (schema may already exist): {e}");
        }

        let fast_store: Arc<dyn FastStore> = Arc::new(RedisStore::connect(&config.redis_url).await?);
        let credential_store: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool));

        Self::assemble(config, credential_store, fast_store, http_client)
    }

    fn assemble(
        config: Config,
        credential_store: Arc<dyn CredentialStore>,
        fast_store: Arc<dyn FastStore>,
        http_client: reqwest::Client,
    ) -> anyhow::Result<Self> {
        let rate_limiter = Arc::new(RateLimiter::new(fast_store.clone(), config.rate_limit_per_minute));
        let response_cache = Arc::new(ResponseCache::new(
            fast_store.clone(),
            config.cache_ttl,
            config.lock_ttl,
            config.single_flight_poll_interval,
            config.single_flight_poll_attempts,
        ));
        let router = Arc::new(BackendRouter::new(config.clone(), http_client.clone())?);
        let metrics = Arc::new(Metrics::new());

        Ok(Self {
            config,
            credential_store,
            fast_store,
            rate_limiter,
            response_cache,
            router,
            metrics,
            http_client,
        })
    }

    /// Test-only constructor — in-memory fakes, no live Postgres/Redis.
    #[doc(hidden)]
    pub fn new_test() -> Self {
        Self::new_test_with_stores().0
    }

    /// Same as `new_test`, but also hands back the concrete in-memory stores
    /// so integration tests can seed credentials or inspect cache/lock keys.
    #[doc(hidden)]
    pub fn new_test_with_stores() -> (
        Self,
        Arc<crate::credential_store::InMemoryCredentialStore>,
        Arc<crate::fast_store::InMemoryStore>,
    ) {
        use crate::credential_store::InMemoryCredentialStore;
        use crate::fast_store::InMemoryStore;
        use std::time::Duration;

        let config = Config {
            database_url: String::new(),
            redis_url: String::new(),
            api_key_pepper: "test-pepper".to_string(),
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
        };

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("failed to build HTTP client");

        let credential_store = Arc::new(InMemoryCredentialStore::new());
        let fast_store = Arc::new(InMemoryStore::new());

        let state = Self::assemble(
            config,
            credential_store.clone(),
            fast_store.clone(),
            http_client,
        )
        .expect("test config uses the built-in dummy backend");

        (state, credential_store, fast_store)
    }
}
