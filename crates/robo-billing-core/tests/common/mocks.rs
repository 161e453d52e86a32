//! Mock payment provider and event builders

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use robo_billing_core::{
    BillingConfig, BillingError, CheckoutRequest, CheckoutSession, CheckoutSessionData,
    InvoiceData, PaymentProvider, SubscriptionData, SubscriptionPeriod, WebhookEvent,
    WebhookEventData, WebhookEventType,
};
use robo_db::{CreateUser, MemoryStore, Store, UserRepository};
use robo_types::{PlanType, UserId};
use uuid::Uuid;

/// Provider double recording every call
#[derive(Default, Clone)]
pub struct MockProvider {
    pub checkouts: Arc<DashMap<String, CheckoutRequest>>,
    pub periods: Arc<DashMap<String, SubscriptionPeriod>>,
    pub canceled: Arc<DashMap<String, ()>>,
    failing: Arc<AtomicBool>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the provider were unreachable
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_period(&self, subscription_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.periods
            .insert(subscription_id.to_string(), SubscriptionPeriod { start, end });
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
        subscription_id: &str,
    ) -> Result<SubscriptionPeriod, BillingError> {
        self.check()?;
        if let Some(period) = self.periods.get(subscription_id) {
            return Ok(*period.value());
        }
        let now = Utc::now();
        Ok(SubscriptionPeriod {
            start: now - Duration::hours(1),
            end: now + Duration::days(30),
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

pub fn billing_config() -> BillingConfig {
    BillingConfig::new("sk_test", "whsec_test")
        .with_price(PlanType::Basic, "price_basic")
        .with_price(PlanType::Premium, "price_premium")
}

pub async fn seed_user(store: &MemoryStore, email: &str) -> UserId {
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .create_user(CreateUser {
            id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: email.to_string(),
            password_hash: "unused".to_string(),
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    user.user_id()
}

pub fn event(id: &str, event_type: WebhookEventType, data: WebhookEventData) -> WebhookEvent {
    WebhookEvent {
        id: id.to_string(),
        event_type,
        data,
        created: Utc::now().timestamp(),
    }
}

pub fn checkout_completed(
    event_id: &str,
    session_id: &str,
    subscription_id: Option<&str>,
) -> WebhookEvent {
    event(
        event_id,
        WebhookEventType::CheckoutSessionCompleted,
        WebhookEventData::CheckoutSession(CheckoutSessionData {
            session_id: session_id.to_string(),
            customer_id: Some("cus_1".to_string()),
            subscription_id: subscription_id.map(str::to_string),
            payment_intent_id: None,
        }),
    )
}

pub fn invoice_event(
    event_id: &str,
    event_type: WebhookEventType,
    subscription_id: &str,
    period: SubscriptionPeriod,
) -> WebhookEvent {
    event(
        event_id,
        event_type,
        WebhookEventData::Invoice(InvoiceData {
            invoice_id: format!("in_{event_id}"),
            subscription_id: Some(subscription_id.to_string()),
            period,
        }),
    )
}

pub fn subscription_event(
    event_id: &str,
    event_type: WebhookEventType,
    subscription_id: &str,
    status: &str,
    cancel_at_period_end: bool,
) -> WebhookEvent {
    let now = Utc::now();
    event(
        event_id,
        event_type,
        WebhookEventData::Subscription(SubscriptionData {
            subscription_id: subscription_id.to_string(),
            customer_id: "cus_1".to_string(),
            status: status.to_string(),
            period_start: now - Duration::days(1),
            period_end: now + Duration::days(29),
            cancel_at_period_end,
        }),
    )
}
