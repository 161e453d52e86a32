//! Mock collaborators and a router harness over the memory store

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use dashmap::DashMap;
use robo_api::{build_router, AppState, Collaborators};
use robo_auth_core::{AuthConfig, AuthError, CredentialHasher, SigningKey};
use robo_billing_core::{
    compute_signature, BillingConfig, BillingError, CheckoutRequest, CheckoutSession,
    PaymentProvider, SubscriptionPeriod,
};
use robo_db::MemoryStore;
use robo_fleet_core::generator::Generated;
use robo_fleet_core::{FleetError, FleetPolicy, ReplyNotifier, ResponseGenerator};
use robo_types::{PlanType, Reply};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_SECRET: &str = "router-test-secret-at-least-32-bytes!!";
pub const WEBHOOK_SECRET: &str = "whsec_router_test";

/// Hasher that stores an opaque handle per password
#[derive(Default, Clone)]
pub struct MockHasher {
    hashes: Arc<DashMap<String, String>>,
}

#[async_trait]
impl CredentialHasher for MockHasher {
    async fn hash(&self, password: &str) -> Result<String, AuthError> {
        let handle = format!("mock${}", Uuid::new_v4());
        self.hashes.insert(handle.clone(), password.to_string());
        Ok(handle)
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(self.hashes.get(hash).is_some_and(|p| p.value() == password))
    }
}

/// Provider double recording checkouts and cancellations
#[derive(Default, Clone)]
pub struct MockProvider {
    pub checkouts: Arc<DashMap<String, CheckoutRequest>>,
    pub canceled: Arc<DashMap<String, ()>>,
    failing: Arc<AtomicBool>,
}

impl MockProvider {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), BillingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BillingError::ProviderError("provider unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for MockProvider {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        self.check()?;
        let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
        self.checkouts.insert(session_id.clone(), request.clone());
        Ok(CheckoutSession {
            url: format!("https://checkout.test/{session_id}"),
            session_id,
        })
    }

    async fn get_subscription_period(
        &self,
        _subscription_id: &str,
    ) -> Result<SubscriptionPeriod, BillingError> {
        self.check()?;
        let now = Utc::now();
        Ok(SubscriptionPeriod {
            start: now - chrono::Duration::hours(1),
            end: now + chrono::Duration::days(30),
        })
    }

    async fn cancel_subscription_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<(), BillingError> {
        self.check()?;
        self.canceled.insert(subscription_id.to_string(), ());
        Ok(())
    }
}

/// Generator answering every prompt with a fixed mood
#[derive(Default, Clone)]
pub struct MockGenerator {
    pub prompts: Arc<DashMap<String, usize>>,
}

#[async_trait]
impl ResponseGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<Generated, FleetError> {
        *self.prompts.entry(prompt.to_string()).or_insert(0) += 1;
        Ok(Generated {
            reply: Reply::new(format!("echo: {prompt}"), "thoughtful"),
            cost: 7.0,
        })
    }
}

/// Notifier that keeps delivered replies
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    pub delivered: Arc<DashMap<String, String>>,
}

#[async_trait]
impl ReplyNotifier for RecordingNotifier {
    async fn notify(&self, reply: &Reply) -> Result<(), String> {
        self.delivered.insert(reply.reply.clone(), reply.mood.clone());
        Ok(())
    }
}

/// Signed `stripe-signature` header for a payload, stamped now
pub fn signed_webhook(payload: &[u8]) -> String {
    let ts = Utc::now().timestamp();
    let sig = compute_signature(WEBHOOK_SECRET, ts, payload).unwrap();
    format!("t={ts},v1={sig}")
}

/// Router wired to a memory store and mock collaborators
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub provider: MockProvider,
    pub generator: MockGenerator,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(FleetPolicy::default())
    }

    pub fn with_policy(policy: FleetPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = MockProvider::default();
        let generator = MockGenerator::default();

        let auth = AuthConfig::new(SigningKey::new(TEST_SECRET).unwrap());
        let billing = BillingConfig::new("sk_test", WEBHOOK_SECRET)
            .with_price(PlanType::Basic, "price_basic")
            .with_price(PlanType::Premium, "price_premium");
        let collaborators = Collaborators {
            hasher: Arc::new(MockHasher::default()),
            provider: Arc::new(provider.clone()),
            generator: Arc::new(generator.clone()),
            notifier: Arc::new(RecordingNotifier::default()),
        };

        let state = AppState::new(
            store.clone(),
            auth,
            billing,
            policy,
            collaborators,
            Duration::from_secs(5),
        );

        Self {
            router: build_router(state, None),
            store,
            provider,
            generator,
        }
    }

    /// Send a request and decode the JSON response, if any
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.call(request).await
    }

    /// Post a raw webhook body with the given signature header
    pub async fn post_webhook(&self, payload: &[u8], signature: Option<&str>) -> StatusCode {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri("/stripe-compatible/webhook")
            .header(header::CONTENT_LENGTH, payload.len());
        if let Some(signature) = signature {
            builder = builder.header("stripe-signature", signature);
        }
        let request = builder.body(Body::from(payload.to_vec())).unwrap();
        self.call(request).await.0
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    /// Register and log in, returning the access token
    pub async fn user_token(&self, email: &str) -> String {
        let (status, _) = self
            .send(
                Method::POST,
                "/auth/register",
                None,
                Some(serde_json::json!({
                    "name": "Alice",
                    "email": email,
                    "password": "correct horse"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(serde_json::json!({ "email": email, "password": "correct horse" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Run a checkout through to a paid robot, returning its id
    pub async fn paid_robot(&self, token: &str, name: &str, subscription_id: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/payments/robot",
                Some(token),
                Some(serde_json::json!({ "robot_name": name, "plan_type": "premium" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let session_id = body["session_id"].as_str().unwrap();

        let payload = checkout_completed_payload(
            &format!("evt_{}", Uuid::new_v4().simple()),
            session_id,
            subscription_id,
        );
        let status = self
            .post_webhook(&payload, Some(&signed_webhook(&payload)))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, robot) = self
            .send(Method::GET, &format!("/robots/{name}"), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        robot["id"].as_str().unwrap().to_string()
    }
}

/// Provider-shaped `checkout.session.completed` body
pub fn checkout_completed_payload(event_id: &str, session_id: &str, subscription_id: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "created": Utc::now().timestamp(),
        "data": {
            "object": {
                "id": session_id,
                "customer": "cus_router",
                "subscription": subscription_id,
                "payment_intent": null
            }
        }
    }))
    .unwrap()
}
