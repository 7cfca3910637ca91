// Jaskier Shared Pattern -- auth
// Bearer-credential authentication against the durable credential store.
// `AuthContext` is an axum extractor: handlers that need it just add it as
// a parameter and get a 401 GatewayError automatically on failure.

use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::GatewayError;
use crate::models::AuthContext;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// `key_hash = HMAC_SHA256(pepper, raw)`, hex-encoded. The pepper defends
/// the hash column against offline comparison if the credential table is
/// exfiltrated without it.
pub fn hash_api_key(pepper: &str, raw_key: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(pepper.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(raw_key.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Extract the bearer credential from an `Authorization` header, yielding
/// `AuthContext` or failing `Unauthenticated`. Record keeping
/// (`last_used_at`) is best-effort: a store write failure here must not
/// fail the request.
pub async fn authenticate(
    state: &AppState,
    authorization: Option<&str>,
) -> Result<AuthContext, GatewayError> {
    let header = authorization.ok_or(GatewayError::Unauthenticated)?;
    let raw_key = header
        .strip_prefix("Bearer ")
        .ok_or(GatewayError::Unauthenticated)?
        .trim();
    if raw_key.is_empty() {
        return Err(GatewayError::Unauthenticated);
    }

    let key_hash = hash_api_key(&state.config.api_key_pepper, raw_key);

    let credential = state
        .credential_store
        .find_active_by_hash(&key_hash)
        .await
        .map_err(|e| GatewayError::Internal(format!("credential lookup failed: {e}")))?
        .ok_or(GatewayError::Unauthenticated)?;

    if let Err(e) = state.credential_store.touch_last_used(credential.id).await {
        tracing::warn!(
            credential_id = %credential.id,
            error = %e,
            "failed to update last_used_at; request proceeds"
        );
    }

    Ok(AuthContext {
        tenant_id: credential.tenant_id,
        credential_id: credential.id,
    })
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let State(state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|_| GatewayError::Internal("failed to extract app state".to_string()))?;

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        authenticate(&state, header).await
    }
}
