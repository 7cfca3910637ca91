// Jaskier Shared Pattern -- error
// Centralized error taxonomy. Internal layers return `GatewayError`; only
// the HTTP surface (handlers.rs) knows how that maps to a status code and
// a sanitized client-facing body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("missing or invalid credential")]
    Unauthenticated,

    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("{provider} backend temporarily unavailable")]
    BreakerOpen { provider: String },

    #[error("dependency unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::Unauthenticated => "UNAUTHENTICATED",
            GatewayError::RateLimited { .. } => "RATE_LIMITED",
            GatewayError::BreakerOpen { .. } => "SERVICE_UNAVAILABLE",
            GatewayError::Unavailable(_) => "SERVICE_UNAVAILABLE",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthenticated => StatusCode::UNAUTHORIZED,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::BreakerOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Never leaks internal detail.
    fn client_message(&self) -> String {
        match self {
            GatewayError::Unauthenticated => "Invalid or inactive API key".to_string(),
            GatewayError::RateLimited { .. } => "Rate limit exceeded".to_string(),
            GatewayError::BreakerOpen { provider } => {
                format!("{provider} backend temporarily unavailable")
            }
            GatewayError::Unavailable(_) => "Service temporarily unavailable".to_string(),
            GatewayError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = uuid::Uuid::new_v4().to_string();

        tracing::error!(
            error_code = self.error_code(),
            status = status.as_u16(),
            request_id = %request_id,
            "{}",
            self
        );

        let message = self.client_message();
        let mut response = (
            status,
            Json(json!({
                "detail": message,
                "error": {
                    "code": self.error_code(),
                    "message": message,
                    "request_id": request_id,
                }
            })),
        )
            .into_response();

        if let GatewayError::RateLimited { retry_after_secs } = &self {
            if let Ok(value) = axum::http::HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(axum::http::header::RETRY_AFTER, value);
            }
        }

        response
    }
}
