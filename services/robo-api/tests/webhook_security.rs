//! Webhook endpoint security and delivery semantics

mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use robo_billing_core::compute_signature;
use serde_json::json;

use common::{checkout_completed_payload, signed_webhook, TestApp, WEBHOOK_SECRET};

async fn pending_session(app: &TestApp, name: &str) -> String {
    let token = app.user_token(&format!("{name}@x.com")).await;
    let (status, body) = app
        .send(
            Method::POST,
            "/payments/robot",
            Some(&token),
            Some(json!({ "robot_name": name, "plan_type": "basic" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    body["session_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let app = TestApp::new();
    let payload = checkout_completed_payload("evt_1", "cs_x", "sub_x");

    assert_eq!(app.post_webhook(&payload, None).await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forged_signature_changes_nothing() {
    let app = TestApp::new();
    let session_id = pending_session(&app, "bot1").await;
    let payload = checkout_completed_payload("evt_forged", &session_id, "sub_forged");

    let ts = Utc::now().timestamp();
    let forged = compute_signature("whsec_attacker", ts, &payload).unwrap();
    let status = app
        .post_webhook(&payload, Some(&format!("t={ts},v1={forged}")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let state = app.store.snapshot().await;
    assert!(state.robots.is_empty());
    assert!(state.webhook_events.is_empty());
    assert_eq!(state.payments[0].status, "pending");
}

#[tokio::test]
async fn test_stale_timestamp_is_rejected() {
    let app = TestApp::new();
    let payload = checkout_completed_payload("evt_old", "cs_x", "sub_x");

    let ts = Utc::now().timestamp() - 600;
    let sig = compute_signature(WEBHOOK_SECRET, ts, &payload).unwrap();
    let status = app
        .post_webhook(&payload, Some(&format!("t={ts},v1={sig}")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_event_type_is_acknowledged() {
    let app = TestApp::new();
    let payload = serde_json::to_vec(&json!({
        "id": "evt_unknown",
        "type": "customer.created",
        "created": Utc::now().timestamp(),
        "data": { "object": { "id": "cus_1" } }
    }))
    .unwrap();

    let status = app.post_webhook(&payload, Some(&signed_webhook(&payload))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_session_asks_for_retry() {
    let app = TestApp::new();
    let payload = checkout_completed_payload("evt_orphan", "cs_never_created", "sub_x");

    let status = app.post_webhook(&payload, Some(&signed_webhook(&payload))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(app.store.snapshot().await.webhook_events.is_empty());
}

#[tokio::test]
async fn test_replayed_delivery_creates_one_robot() {
    let app = TestApp::new();
    let session_id = pending_session(&app, "bot1").await;
    let payload = checkout_completed_payload("evt_replay", &session_id, "sub_replay");

    for _ in 0..3 {
        let status = app.post_webhook(&payload, Some(&signed_webhook(&payload))).await;
        assert_eq!(status, StatusCode::OK);
    }

    let state = app.store.snapshot().await;
    assert_eq!(state.robots.len(), 1);
    assert_eq!(state.plans.len(), 1);
    assert_eq!(state.webhook_events.len(), 1);
}

#[tokio::test]
async fn test_oversized_body_is_refused() {
    let app = TestApp::new();
    let payload = vec![b' '; 64 * 1024 + 1];

    let status = app.post_webhook(&payload, Some(&signed_webhook(&payload))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_store_outage_is_500_then_retry_succeeds() {
    let app = TestApp::new();
    let session_id = pending_session(&app, "bot1").await;
    let payload = checkout_completed_payload("evt_outage", &session_id, "sub_outage");

    app.store.set_unavailable(true);
    let status = app.post_webhook(&payload, Some(&signed_webhook(&payload))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    app.store.set_unavailable(false);
    let status = app.post_webhook(&payload, Some(&signed_webhook(&payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.store.snapshot().await.robots.len(), 1);
}
