//! Robot conversation handler

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use robo_types::Reply;
use serde::Deserialize;

use super::shared::record_op_duration;
use crate::error::ApiResult;
use crate::extractors::RobotAuth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ConversaRequest {
    pub text: String,
}

/// POST /conversa
pub async fn conversa(
    State(state): State<AppState>,
    RobotAuth(access): RobotAuth,
    Json(req): Json<ConversaRequest>,
) -> ApiResult<Json<Reply>> {
    let start = Instant::now();
    let result = state
        .conversations
        .converse(access.robot_id(), &req.text)
        .await;
    record_op_duration("conversa", start, result.is_ok());

    let result_label = if result.is_ok() { "ok" } else { "err" };
    metrics::counter!("robo_conversations_total", "result" => result_label).increment(1);

    Ok(Json(result?))
}
