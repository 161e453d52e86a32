//! Auth errors

use robo_fleet_core::FleetError;
use thiserror::Error;

/// Authentication and authorization errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing, malformed, expired or badly signed token
    #[error("invalid token")]
    InvalidToken,

    /// Unknown email or wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Malformed input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Email already registered
    #[error("conflict: {0}")]
    Conflict(String),

    /// Entity not found
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Robot has no current entitlement
    #[error("payment required")]
    PaymentRequired,

    /// Robot's plan has expired
    #[error("plan expired")]
    PlanExpired,

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::InvalidToken | Self::InvalidCredentials => 401,
            Self::PaymentRequired | Self::PlanExpired => 402,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidToken => "INVALID_TOKEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Conflict(_) => "CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PaymentRequired => "PAYMENT_REQUIRED",
            Self::PlanExpired => "PLAN_EXPIRED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<robo_db::DbError> for AuthError {
    fn from(err: robo_db::DbError) -> Self {
        tracing::error!("Database error: {}", err);
        Self::Database(err.to_string())
    }
}

impl From<FleetError> for AuthError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            FleetError::Conflict(msg) => Self::Conflict(msg),
            FleetError::Unauthorized => Self::InvalidToken,
            FleetError::NotFound(what) => Self::NotFound(what),
            FleetError::PaymentRequired => Self::PaymentRequired,
            FleetError::Database(e) => e.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}
