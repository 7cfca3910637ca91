// Jaskier Shared Pattern -- handlers
// The HTTP surface. Thin: auth → rate-limit → cache-key → single-flight
// (or direct produce on cache_bypass) → router → backend → respond.

use std::time::Instant;

use axum::extract::State;
use axum::Json;

use crate::cache_key::{self, PredictParams};
use crate::error::GatewayError;
use crate::models::{AuthContext, HealthResponse, PredictRequest, PredictResponse, ReadinessResponse};
use crate::state::AppState;

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn readyz(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let db = state.credential_store.ping().await;
    let redis = state.fast_store.ping().await;
    let status = if db && redis { "ready" } else { "not ready" };
    Json(ReadinessResponse { status, db, redis })
}

pub async fn predict(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, GatewayError> {
    let started = Instant::now();
    let tenant_label = auth.tenant_id.to_string();

    state
        .rate_limiter
        .check(auth.tenant_id, auth.credential_id)
        .await
        .inspect_err(|_| {
            state
                .metrics
                .rate_limit_hits_total
                .with_label_values(&[&tenant_label])
                .inc();
        })?;

    let params = PredictParams {
        temperature: req.temperature,
        max_tokens: req.max_tokens,
    };
    let fingerprint = cache_key::fingerprint(auth.tenant_id, &req.model, &req.prompt, params);

    let router = state.router.clone();
    let metrics_for_route = state.metrics.clone();
    let model = req.model.clone();
    let prompt = req.prompt.clone();
    let tenant_id = auth.tenant_id;
    let temperature = req.temperature;
    let max_tokens = req.max_tokens;

    let produce = move || {
        let router = router.clone();
        let metrics = metrics_for_route.clone();
        let model = model.clone();
        let prompt = prompt.clone();
        async move {
            let decision = router.route(&model, &metrics).await?;
            match decision.backend.predict(tenant_id, &prompt, &model, temperature, max_tokens).await {
                Ok(output) => {
                    router.breaker_for(decision.provider).on_success().await;
                    Ok(output)
                }
                Err(e) => {
                    router.breaker_for(decision.provider).on_failure().await;
                    metrics.provider_failures.with_label_values(&[decision.provider]).inc();
                    Err(e)
                }
            }
        }
    };

    let produced = if req.cache_bypass {
        produce().await.map_err(downcast_pipeline_error)
    } else {
        state
            .response_cache
            .single_flight(&fingerprint, &tenant_label, &state.metrics, produce)
            .await
            .map_err(downcast_pipeline_error)
    };

    let output = produced.inspect_err(|err| {
        state
            .metrics
            .errors_total
            .with_label_values(&[&tenant_label, err.error_code()])
            .inc();
    })?;

    state
        .metrics
        .requests_total
        .with_label_values(&[&tenant_label, "200"])
        .inc();
    state
        .metrics
        .request_latency_seconds
        .with_label_values(&[&tenant_label])
        .observe(started.elapsed().as_secs_f64());

    Ok(Json(PredictResponse { output }))
}

pub async fn metrics_handler(State(state): State<AppState>) -> String {
    state.metrics.render()
}

/// `router.route()` surfaces `GatewayError::BreakerOpen` through `anyhow`
/// (the producer closure's signature is fixed by the cache's `anyhow::Result`
/// contract) — recover the original variant so breaker-open still reaches
/// the client as 503, not a generic 500.
fn downcast_pipeline_error(err: anyhow::Error) -> GatewayError {
    match err.downcast::<GatewayError>() {
        Ok(gateway_err) => gateway_err,
        Err(err) => GatewayError::Internal(format!("backend call failed: {err}")),
    }
}
