//! User registration and login

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use robo_auth_core::RegisteredUser;
use serde::{Deserialize, Serialize};

use super::shared::record_op_duration;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisteredUser>)> {
    let start = Instant::now();
    let result = state.auth.register(&req.name, &req.email, &req.password).await;
    record_op_duration("register", start, result.is_ok());

    Ok((StatusCode::CREATED, Json(result?)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let start = Instant::now();
    let result = state.auth.login(&req.email, &req.password).await;
    record_op_duration("login", start, result.is_ok());

    let issued = result?;
    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "Bearer",
        expires_at: issued.expires_at,
    }))
}
