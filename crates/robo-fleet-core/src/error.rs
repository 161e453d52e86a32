//! Fleet errors

use thiserror::Error;

/// Errors from the registry, ledger and conversation components
#[derive(Error, Debug)]
pub enum FleetError {
    /// Malformed input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Robot name already registered
    #[error("conflict: {0}")]
    Conflict(String),

    /// Robot identity could not be resolved
    #[error("unauthorized")]
    Unauthorized,

    /// Robot is not linked to a user
    #[error("robot is not linked to a user")]
    Forbidden,

    /// Entity not found
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Robot has no current entitlement
    #[error("robot plan is inactive or expired")]
    PaymentRequired,

    /// Message quota exhausted
    #[error("message quota reached: {used} / {quota}")]
    TooManyRequests {
        /// Messages already used
        used: i64,
        /// Quota
        quota: i64,
    },

    /// Response generator failed or returned unusable output
    #[error("generation error: {0}")]
    Generation(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] robo_db::DbError),
}

impl FleetError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidArgument(_) => 400,
            Self::Unauthorized => 401,
            Self::PaymentRequired => 402,
            Self::Forbidden => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::TooManyRequests { .. } => 429,
            Self::Generation(_) | Self::Database(_) => 500,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PaymentRequired => "PAYMENT_REQUIRED",
            Self::TooManyRequests { .. } => "TOO_MANY_REQUESTS",
            Self::Generation(_) | Self::Database(_) => "INTERNAL_ERROR",
        }
    }
}
