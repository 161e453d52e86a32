//! Router tests over the memory store

mod common;

use axum::http::{Method, StatusCode};
use robo_fleet_core::FleetPolicy;
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");

    app.store.set_unavailable(true);
    let (status, _) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_register_login_and_duplicate_email() {
    let app = TestApp::new();
    app.user_token("alice@x.com").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Other", "email": "ALICE@x.com", "password": "whatever123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "alice@x.com", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "Bob", "email": "bob@x.com", "password": "short" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ARGUMENT");
}

#[tokio::test]
async fn test_user_routes_require_bearer_token() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/robots", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");

    let (status, _) = app
        .send(Method::GET, "/robots", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_paid_robot_can_talk() {
    let app = TestApp::new();
    let token = app.user_token("alice@x.com").await;
    let robot_id = app.paid_robot(&token, "bot1", "sub_journey").await;

    let (status, robots) = app.send(Method::GET, "/robots", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let robots = robots.as_array().unwrap();
    assert_eq!(robots.len(), 1);
    assert_eq!(robots[0]["status"], "active");
    assert!(robots[0]["plan_valid_until"].is_string());

    let (status, issued) = app
        .send(
            Method::POST,
            &format!("/robots/{robot_id}/token"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let robot_token = issued["token"].as_str().unwrap();

    let (status, reply) = app
        .send(
            Method::POST,
            "/conversa",
            Some(robot_token),
            Some(json!({ "text": "Por que o céu é azul?" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["reply"], "echo: Por que o céu é azul?");
    assert_eq!(reply["mood"], "thoughtful");

    let state = app.store.snapshot().await;
    assert_eq!(state.conversation_logs.len(), 1);
    assert_eq!(state.users[0].messages_used, 1);
}

#[tokio::test]
async fn test_checkout_validation() {
    let app = TestApp::new();
    let token = app.user_token("alice@x.com").await;
    app.paid_robot(&token, "bot1", "sub_taken").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/payments/robot",
            Some(&token),
            Some(json!({ "robot_name": "bot1", "plan_type": "basic" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = app
        .send(
            Method::POST,
            "/payments/robot",
            Some(&token),
            Some(json!({ "robot_name": "bot2", "plan_type": "gold" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // One checkout from paid_robot, none from the rejected requests
    assert_eq!(app.provider.checkouts.len(), 1);
}

#[tokio::test]
async fn test_provider_outage_is_opaque_500() {
    let app = TestApp::new();
    let token = app.user_token("alice@x.com").await;
    app.provider.set_failing(true);

    let (status, body) = app
        .send(
            Method::POST,
            "/payments/robot",
            Some(&token),
            Some(json!({ "robot_name": "bot1", "plan_type": "basic" })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "internal server error");
    assert!(app.store.snapshot().await.payments.is_empty());
}

#[tokio::test]
async fn test_payment_status_is_informational() {
    let app = TestApp::new();
    let token = app.user_token("alice@x.com").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/payments/status",
            Some(&token),
            Some(json!({ "session_id": "cs_anything" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["session_id"], "cs_anything");
    assert!(body["note"].is_string());
}

#[tokio::test]
async fn test_user_token_cannot_talk() {
    let app = TestApp::new();
    let token = app.user_token("alice@x.com").await;
    app.paid_robot(&token, "bot1", "sub_user_tok").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/conversa",
            Some(&token),
            Some(json!({ "text": "hello" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(app.generator.prompts.is_empty());
}

#[tokio::test]
async fn test_robots_are_owner_scoped() {
    let app = TestApp::new();
    let alice = app.user_token("alice@x.com").await;
    let mallory = app.user_token("mallory@x.com").await;
    let robot_id = app.paid_robot(&alice, "bot1", "sub_scoped").await;

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/robots/{robot_id}/token"),
            Some(&mallory),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::GET, "/robots/bot1", Some(&mallory), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, robots) = app.send(Method::GET, "/robots", Some(&mallory), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(robots.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_quota_exhaustion_is_429() {
    let app = TestApp::with_policy(FleetPolicy::default().with_message_quota(1));
    let token = app.user_token("alice@x.com").await;
    let robot_id = app.paid_robot(&token, "bot1", "sub_quota").await;

    let (_, issued) = app
        .send(
            Method::POST,
            &format!("/robots/{robot_id}/token"),
            Some(&token),
            None,
        )
        .await;
    let robot_token = issued["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::POST,
            "/conversa",
            Some(&robot_token),
            Some(json!({ "text": "first" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            "/conversa",
            Some(&robot_token),
            Some(json!({ "text": "second" })),
        )
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "TOO_MANY_REQUESTS");
    assert_eq!(app.store.snapshot().await.conversation_logs.len(), 1);
}

#[tokio::test]
async fn test_cancel_subscription_at_period_end() {
    let app = TestApp::new();
    let token = app.user_token("alice@x.com").await;
    let robot_id = app.paid_robot(&token, "bot1", "sub_cancel").await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/robots/{robot_id}/subscription/cancel"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancel_at_period_end"], true);
    assert!(app.provider.canceled.contains_key("sub_cancel"));

    // Still entitled until the period ends
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/robots/{robot_id}/token"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
