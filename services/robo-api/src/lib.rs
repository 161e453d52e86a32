//! Robo API
//!
//! HTTP surface for robot registration, checkout, webhooks and conversations.
//!
//! ## User endpoints (user bearer token)
//!
//! - `POST /payments/robot` - Open a checkout for a new robot
//! - `POST /payments/status` - Informational payment status
//! - `GET /robots` - List the caller's robots
//! - `GET /robots/{name}` - Get one of the caller's robots
//! - `POST /robots/{id}/token` - Issue a robot token
//! - `POST /robots/{id}/subscription/cancel` - Cancel at period end
//!
//! ## Robot endpoints (robot bearer token, entitlement checked)
//!
//! - `POST /conversa` - Ask the robot something
//!
//! ## Public endpoints
//!
//! - `POST /auth/register`, `POST /auth/login`
//! - `POST /stripe-compatible/webhook` - Signed provider callbacks
//! - `GET /health`, `GET /ready`, `GET /metrics`

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod state;
pub mod telemetry;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use state::{AppState, Collaborators};

/// Build the HTTP router
pub fn build_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let request_timeout = state.request_timeout();

    let api = Router::new()
        // Accounts
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        // Payments
        .route("/payments/robot", post(handlers::create_robot_checkout))
        .route("/payments/status", post(handlers::payment_status))
        // Robots
        .route("/robots", get(handlers::list_robots))
        .route("/robots/{name}", get(handlers::get_robot))
        .route("/robots/{id}/token", post(handlers::issue_robot_token))
        .route(
            "/robots/{id}/subscription/cancel",
            post(handlers::cancel_robot_subscription),
        )
        // Conversation
        .route("/conversa", post(handlers::conversa));

    // Raw body, signature checked by the handler
    let webhook_routes = Router::new()
        .route("/stripe-compatible/webhook", post(handlers::stripe_webhook))
        .layer(RequestBodyLimitLayer::new(handlers::webhook::MAX_WEBHOOK_BODY));

    let health_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready));

    let metrics_route = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    // Outermost first
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .merge(api)
        .merge(webhook_routes)
        .layer(middleware)
        .merge(health_routes)
        .merge(metrics_route)
        .with_state(state)
}
