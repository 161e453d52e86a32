//! Error types for the API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use robo_auth_core::AuthError;
use robo_billing_core::BillingError;
use robo_fleet_core::FleetError;
use serde::Serialize;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error(transparent)]
    Billing(#[from] BillingError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        let code = match self {
            Self::Auth(e) => e.status_code(),
            Self::Fleet(e) => e.status_code(),
            Self::Billing(e) => e.status_code(),
            Self::BadRequest(_) => 400,
        };
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Auth(e) => e.error_code(),
            Self::Fleet(e) => e.error_code(),
            Self::Billing(e) => e.error_code(),
            Self::BadRequest(_) => "INVALID_ARGUMENT",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Internal detail stays in the logs
        let message = if status.is_server_error() {
            tracing::error!(error = ?self, "Internal API error");
            "internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
