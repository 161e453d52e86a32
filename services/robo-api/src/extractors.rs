//! Axum extractors for authentication
//!
//! [`AuthUser`] accepts user access tokens. [`RobotAuth`] runs the access
//! gate, so a handler taking it only runs for an entitled robot.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use robo_auth_core::RobotAccess;
use robo_types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

/// Authenticated user extracted from request
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: UserId,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let user_id = state.auth.authenticate_user(authorization(parts))?;
        Ok(Self { user_id })
    }
}

/// Robot that passed the access gate
#[derive(Debug, Clone)]
pub struct RobotAuth(pub RobotAccess);

impl<S> FromRequestParts<S> for RobotAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let access = state.gate.authorize(authorization(parts)).await.map_err(|e| {
            tracing::debug!(error = %e, "Robot request rejected");
            e
        })?;
        Ok(Self(access))
    }
}
