//! Checkout handlers

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::shared::record_op_duration;
use crate::error::ApiResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RobotCheckoutRequest {
    pub robot_name: String,
    pub plan_type: String,
}

#[derive(Debug, Serialize)]
pub struct RobotCheckoutResponse {
    pub session_id: String,
    pub checkout_url: String,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub session_id: String,
    pub message: &'static str,
    pub note: &'static str,
}

/// POST /payments/robot
///
/// Opens a checkout for a new robot. The robot itself is created when the
/// provider confirms payment through the webhook.
pub async fn create_robot_checkout(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RobotCheckoutRequest>,
) -> ApiResult<Json<RobotCheckoutResponse>> {
    let start = Instant::now();
    let profile = state.auth.profile(user.user_id).await?;

    let result = state
        .payments
        .create_checkout_request(profile.id, &req.robot_name, &req.plan_type, &profile.email)
        .await;
    record_op_duration("create_checkout", start, result.is_ok());
    let session = result?;

    metrics::counter!("robo_checkouts_created_total").increment(1);
    info!(user_id = %profile.id, session_id = %session.session_id, "Checkout created");

    Ok(Json(RobotCheckoutResponse {
        session_id: session.session_id,
        checkout_url: session.url,
        message: "Complete the payment to activate your robot",
    }))
}

/// POST /payments/status
///
/// Informational only. Settlement happens through the provider webhook.
pub async fn payment_status(
    _user: AuthUser,
    Json(req): Json<PaymentStatusRequest>,
) -> Json<PaymentStatusResponse> {
    Json(PaymentStatusResponse {
        session_id: req.session_id,
        message: "Payment status is confirmed by the payment provider",
        note: "The robot is activated automatically once the payment is confirmed",
    })
}
