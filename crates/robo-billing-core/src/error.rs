//! Billing errors

use robo_db::DbError;
use robo_fleet_core::FleetError;
use thiserror::Error;
use tracing::error;

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// Malformed input or unknown plan tier
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Robot name already registered
    #[error("conflict: {0}")]
    Conflict(String),

    /// Payment, session or subscription not found
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Payment provider error
    #[error("provider error: {0}")]
    ProviderError(String),

    /// Webhook verification or parsing error
    #[error("webhook error: {0}")]
    WebhookError(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) | Self::WebhookError(_) => 400,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::ProviderError(_) | Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) | Self::WebhookError(_) => "INVALID_ARGUMENT",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::ProviderError(_) | Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a provider error
    pub fn is_provider_error(&self) -> bool {
        matches!(self, Self::ProviderError(_))
    }
}

impl From<DbError> for BillingError {
    fn from(err: DbError) -> Self {
        error!(error = %err, "Database error in billing");
        Self::Database(err.to_string())
    }
}

impl From<FleetError> for BillingError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            FleetError::Conflict(msg) => Self::Conflict(msg),
            FleetError::NotFound(what) => Self::NotFound(what),
            FleetError::Database(db) => db.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}
