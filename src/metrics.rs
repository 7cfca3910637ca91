// Jaskier Shared Pattern -- metrics
// A single `prometheus::Registry` wired up at startup, handed to handlers
// via `AppState`. `/metrics` renders it with the text exposition format.

use prometheus::{CounterVec, HistogramVec, Opts, Registry};

pub struct Metrics {
    pub registry: Registry,
    pub requests_total: CounterVec,
    pub request_latency_seconds: HistogramVec,
    pub cache_hits_total: CounterVec,
    pub cache_misses_total: CounterVec,
    pub rate_limit_hits_total: CounterVec,
    pub errors_total: CounterVec,
    pub provider_failures: CounterVec,
    pub provider_rejections: CounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("inference_requests_total", "Total inference requests handled"),
            &["tenant_id", "status"],
        )
        .expect("valid metric definition");

        let request_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "inference_request_latency_seconds",
                "End-to-end latency of /v1/predict",
            ),
            &["tenant_id"],
        )
        .expect("valid metric definition");

        let cache_hits_total = CounterVec::new(
            Opts::new("inference_cache_hits_total", "Response cache hits"),
            &["tenant_id"],
        )
        .expect("valid metric definition");

        let cache_misses_total = CounterVec::new(
            Opts::new("inference_cache_misses_total", "Response cache misses"),
            &["tenant_id"],
        )
        .expect("valid metric definition");

        let rate_limit_hits_total = CounterVec::new(
            Opts::new("inference_rate_limit_hits_total", "Requests rejected by the rate limiter"),
            &["tenant_id"],
        )
        .expect("valid metric definition");

        let errors_total = CounterVec::new(
            Opts::new("inference_errors_total", "Requests that ended in an error"),
            &["tenant_id", "error_type"],
        )
        .expect("valid metric definition");

        let provider_failures = CounterVec::new(
            Opts::new("provider_failures_total", "Backend calls that returned an error"),
            &["provider"],
        )
        .expect("valid metric definition");

        let provider_rejections = CounterVec::new(
            Opts::new(
                "provider_rejections_total",
                "Requests rejected outright because a provider's circuit breaker was open",
            ),
            &["provider"],
        )
        .expect("valid metric definition");

        for collector in [
            Box::new(requests_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(cache_hits_total.clone()),
            Box::new(cache_misses_total.clone()),
            Box::new(rate_limit_hits_total.clone()),
            Box::new(errors_total.clone()),
            Box::new(provider_failures.clone()),
            Box::new(provider_rejections.clone()),
        ] {
            registry
                .register(collector)
                .expect("metric name collision at registration");
        }
        registry
            .register(Box::new(request_latency_seconds.clone()))
            .expect("metric name collision at registration");

        Self {
            registry,
            requests_total,
            request_latency_seconds,
            cache_hits_total,
            cache_misses_total,
            rate_limit_hits_total,
            errors_total,
            provider_failures,
            provider_rejections,
        }
    }

    pub fn render(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&metric_families, &mut buf)
            .expect("prometheus text encoding never fails on valid metrics");
        String::from_utf8(buf).expect("prometheus text encoder emits valid utf8")
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metric_names() {
        let metrics = Metrics::new();
        metrics
            .requests_total
            .with_label_values(&["11111111-1111-1111-1111-111111111111", "200"])
            .inc();
        let rendered = metrics.render();
        assert!(rendered.contains("inference_requests_total"));
    }
}
