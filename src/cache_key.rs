// Jaskier Shared Pattern -- cache key
// Canonical, deterministic fingerprint of (tenant, model, prompt, params).
// Pure: no I/O, no suspension points.

use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// The recognised parameter set. Sensitive to the full set even when
/// default-valued, so default parameters share a bucket — any deviation
/// forks it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Deterministic fingerprint: `cache:<sha256-hex>`. Two requests with
/// identical inputs produce byte-identical output regardless of any
/// map-iteration order upstream, because the fields are serialized through
/// a fixed-key-order JSON object rather than an iterated map.
pub fn fingerprint(tenant_id: Uuid, model: &str, prompt: &str, params: PredictParams) -> String {
    let normalized = json!({
        "model": model,
        "params": {
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        },
        "prompt": prompt,
        "tenant_id": tenant_id.to_string(),
    });
    // serde_json::Value serializes object keys in sorted order when built
    // from a `json!` object literal only if the `preserve_order` feature is
    // off (the default) — BTreeMap-backed Map guarantees sorted keys here.
    let payload = serde_json::to_string(&normalized).expect("json serialization cannot fail");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    let digest = hex::encode(hasher.finalize());

    format!("cache:{digest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_identical_inputs() {
        let tenant = Uuid::new_v4();
        let params = PredictParams {
            temperature: 0.0,
            max_tokens: 100,
        };
        let a = fingerprint(tenant, "dummy-model", "hello", params);
        let b = fingerprint(tenant, "dummy-model", "hello", params);
        assert_eq!(a, b);
        assert!(a.starts_with("cache:"));
        assert_eq!(a.len(), "cache:".len() + 64);
    }

    #[test]
    fn differs_on_any_field() {
        let tenant = Uuid::new_v4();
        let base = PredictParams {
            temperature: 0.0,
            max_tokens: 100,
        };
        let a = fingerprint(tenant, "dummy-model", "hello", base);

        let diff_prompt = fingerprint(tenant, "dummy-model", "hello world", base);
        let diff_model = fingerprint(tenant, "gpt-4", "hello", base);
        let diff_temp = fingerprint(
            tenant,
            "dummy-model",
            "hello",
            PredictParams {
                temperature: 0.7,
                ..base
            },
        );
        let diff_tenant = fingerprint(Uuid::new_v4(), "dummy-model", "hello", base);

        assert_ne!(a, diff_prompt);
        assert_ne!(a, diff_model);
        assert_ne!(a, diff_temp);
        assert_ne!(a, diff_tenant);
    }

    #[test]
    fn default_params_share_a_bucket_across_explicit_and_implicit_calls() {
        let tenant = Uuid::new_v4();
        let defaults = PredictParams {
            temperature: 0.0,
            max_tokens: 100,
        };
        let explicit = fingerprint(tenant, "dummy-model", "hi", defaults);
        let also_defaults = fingerprint(
            tenant,
            "dummy-model",
            "hi",
            PredictParams {
                temperature: 0.0,
                max_tokens: 100,
            },
        );
        assert_eq!(explicit, also_defaults);
    }
}
