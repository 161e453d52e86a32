//! Owner-facing robot handlers

use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use robo_db::SubscriptionRow;
use robo_fleet_core::RobotView;
use robo_types::RobotId;
use serde::Serialize;
use uuid::Uuid;

use super::shared::record_op_duration;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RobotTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub robot_id: Uuid,
    pub plan_type: String,
    pub status: String,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
}

impl From<SubscriptionRow> for SubscriptionResponse {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            robot_id: row.robot_id,
            plan_type: row.plan_type,
            status: row.status,
            current_period_end: row.current_period_end,
            cancel_at_period_end: row.cancel_at_period_end,
        }
    }
}

/// GET /robots
pub async fn list_robots(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<RobotView>>> {
    Ok(Json(state.registry.list_for_owner(user.user_id).await?))
}

/// GET /robots/{name}
pub async fn get_robot(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> ApiResult<Json<RobotView>> {
    Ok(Json(state.registry.find_for_owner(user.user_id, &name).await?))
}

/// POST /robots/{id}/token
pub async fn issue_robot_token(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RobotTokenResponse>> {
    let start = Instant::now();
    let result = state
        .auth
        .generate_robot_token(RobotId(id), user.user_id)
        .await;
    record_op_duration("issue_robot_token", start, result.is_ok());
    let issued = result?;

    metrics::counter!("robo_robot_tokens_issued_total").increment(1);
    Ok(Json(RobotTokenResponse {
        token: issued.token,
        expires_at: issued.expires_at,
    }))
}

/// POST /robots/{id}/subscription/cancel
///
/// Cancels at the end of the current period; the robot stays entitled
/// until then.
pub async fn cancel_robot_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let start = Instant::now();
    let result = state
        .payments
        .cancel_subscription(RobotId(id), user.user_id)
        .await;
    record_op_duration("cancel_subscription", start, result.is_ok());
    let subscription = result?;

    metrics::counter!("robo_subscriptions_canceled_total").increment(1);
    Ok(Json(subscription.into()))
}
