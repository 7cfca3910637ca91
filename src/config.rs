// Jaskier Shared Pattern -- config
// Typed, environment-sourced settings. Loaded once at startup; cheap to
// clone (everything is owned `String`/`Duration`/primitives).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub api_key_pepper: String,
    pub inference_backend: String,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,

    pub rate_limit_per_minute: u32,
    pub cache_ttl: Duration,
    pub lock_ttl: Duration,
    pub single_flight_poll_interval: Duration,
    pub single_flight_poll_attempts: u32,

    pub remote_breaker_threshold: u32,
    pub remote_breaker_cooldown: Duration,
    pub local_breaker_threshold: u32,
    pub local_breaker_cooldown: Duration,

    pub port: u16,
}

impl Config {
    /// Load from the process environment. `dotenvy::dotenv()` should be
    /// called by the binary before this, so a local `.env` is picked up.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is not set"))?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let api_key_pepper = std::env::var("API_KEY_PEPPER").unwrap_or_else(|_| {
            tracing::warn!("API_KEY_PEPPER not set — using an insecure development default");
            "dev-pepper-change-me".to_string()
        });

        let inference_backend =
            std::env::var("INFERENCE_BACKEND").unwrap_or_else(|_| "dummy".to_string());

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok().filter(|s| !s.is_empty());
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty());

        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        Ok(Self {
            database_url,
            redis_url,
            api_key_pepper,
            inference_backend,
            openai_api_key,
            gemini_api_key,
            rate_limit_per_minute: 10,
            cache_ttl: Duration::from_secs(300),
            lock_ttl: Duration::from_secs(10),
            single_flight_poll_interval: Duration::from_millis(100),
            single_flight_poll_attempts: 20,
            remote_breaker_threshold: 3,
            remote_breaker_cooldown: Duration::from_secs(60),
            local_breaker_threshold: 5,
            local_breaker_cooldown: Duration::from_secs(30),
            port,
        })
    }
}
