//! Payment provider webhook handler

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use super::shared::record_op_duration;
use crate::state::AppState;

/// Header carrying `t=<unix>,v1=<hex>` signatures
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum accepted webhook body
pub const MAX_WEBHOOK_BODY: usize = 64 * 1024;

fn count(outcome: &'static str) {
    metrics::counter!("robo_webhooks_processed_total", "outcome" => outcome).increment(1);
}

/// POST /stripe-compatible/webhook
///
/// 4xx tells the provider to retry later; only a processed or ignored event
/// is acknowledged with 200.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let start = Instant::now();

    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing Stripe-Signature header");
        count("rejected");
        return StatusCode::BAD_REQUEST;
    };

    let event = match state.webhooks.verify_and_parse(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Webhook rejected");
            count("rejected");
            return StatusCode::BAD_REQUEST;
        }
    };

    match state.payments.handle_event(&event).await {
        Ok(outcome) => {
            tracing::info!(
                event_id = %event.id,
                event_type = %event.event_type,
                outcome = outcome.as_str(),
                "Webhook processed"
            );
            count(outcome.as_str());
            record_op_duration("process_webhook", start, true);
            StatusCode::OK
        }
        Err(e) => {
            record_op_duration("process_webhook", start, false);
            count("error");
            if e.status_code() >= 500 {
                tracing::error!(event_id = %event.id, error = ?e, "Webhook processing failed");
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                tracing::warn!(event_id = %event.id, error = %e, "Webhook refers to unknown state");
                StatusCode::BAD_REQUEST
            }
        }
    }
}
