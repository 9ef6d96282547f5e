//! The outermost error boundary: domain errors to HTTP responses.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::json;
use signdesk_core::SignDeskError;

/// A [`SignDeskError`] on its way out of a handler.
///
/// Client faults keep their message; anything unexpected is logged here and
/// replaced by a generic message.
#[derive(Debug)]
pub struct ApiError(pub SignDeskError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<SignDeskError> for ApiError {
    fn from(err: SignDeskError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn input(message: impl Into<String>) -> Self {
        Self(SignDeskError::input(message))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            SignDeskError::Input(_) => StatusCode::BAD_REQUEST,
            SignDeskError::RateLimited { .. } | SignDeskError::Throttled { .. } => {
                StatusCode::TOO_MANY_REQUESTS
            }
            SignDeskError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let timestamp = Utc::now();
        let message = match &self.0 {
            SignDeskError::Input(message) | SignDeskError::ServiceUnavailable(message) => {
                message.clone()
            }
            err @ (SignDeskError::RateLimited { .. } | SignDeskError::Throttled { .. }) => {
                err.to_string()
            }
            err => {
                tracing::error!(error = ?err, "Request failed");
                "Internal server error".to_string()
            }
        };

        let Some(retry_after_ms) = self.0.retry_after_ms() else {
            let body = json!({ "success": false, "error": message, "timestamp": timestamp });
            return (status, Json(body)).into_response();
        };

        let body = json!({
            "success": false,
            "error": message,
            "retry_after": retry_after_ms as f64 / 1000.0,
            "timestamp": timestamp,
        });
        let mut response = (status, Json(body)).into_response();
        // Retry-After only takes whole seconds.
        let seconds = retry_after_ms.div_ceil(1000).max(1);
        if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::input("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError(SignDeskError::unavailable("x")).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError(SignDeskError::Throttled { retry_after_ms: 40 }).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError(SignDeskError::backend("down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_rate_limited_response_carries_retry_after() {
        let response =
            ApiError(SignDeskError::RateLimited { retry_after_ms: 1500 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let response = ApiError(SignDeskError::internal("secret path")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
