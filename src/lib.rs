pub mod auth;
pub mod backends;
pub mod breaker;
pub mod cache_key;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod fast_store;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod response_cache;
pub mod router;
pub mod state;

use axum::routing::{get, post};
use axum::Router;

use state::AppState;

// ═══════════════════════════════════════════════════════════════════════
//  Request correlation ID middleware — Jaskier Shared Pattern
// ═══════════════════════════════════════════════════════════════════════

/// Adds a request-id to the tracing span, echoes it as `X-Request-Id`, and
/// accepts an incoming `X-Request-Id` to propagate one set upstream.
async fn request_id_middleware(
    req: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("request_id", &request_id.as_str());

    let mut response = next.run(req).await;

    if let Ok(header_value) = axum::http::HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", header_value);
    }

    response
}

/// Build the application router with the given shared state. Extracted
/// from `main()` so integration tests can construct the app without
/// binding to a network port.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/v1/predict", post(handlers::predict))
        .route("/metrics/", get(handlers::metrics_handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}
