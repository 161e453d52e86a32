//! Payment reconciliation engine
//!
//! Checkout requests become pending payments; provider events settle them.
//! Every settlement runs in one transaction scoped by the payment row, so a
//! redelivered or concurrent event sees the first one's result and does
//! nothing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use robo_db::{
    CreatePayment, PaymentCompletion, PaymentRepository, PaymentRow, RobotRepository, Store,
    StoreTx, SubscriptionRepository, SubscriptionRow, WebhookEventRepository,
};
use robo_fleet_core::ledger::{self, ProviderState, ProviderSubscription};
use robo_fleet_core::{registry, FleetPolicy};
use robo_types::{
    PaymentMetadata, PaymentProviderKind, PaymentStatus, PlanType, RobotId, RobotStatus,
    SubscriptionStatus, UserId, DEFAULT_CURRENCY,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::provider::{CheckoutRequest, PaymentProvider, SubscriptionPeriod};
use crate::webhook::{CheckoutSessionData, WebhookEvent, WebhookEventData, WebhookEventType};
use crate::CheckoutSession;

/// Result of applying a provider event or direct settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed
    Applied,
    /// Event or payment was already settled; nothing changed
    AlreadyApplied,
    /// Event acknowledged without effect
    Ignored,
}

impl Outcome {
    /// Label for logs and metrics
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::AlreadyApplied => "already_applied",
            Self::Ignored => "ignored",
        }
    }
}

/// Drives payments from checkout to settlement
#[derive(Clone)]
pub struct PaymentEngine {
    store: Arc<dyn Store>,
    provider: Arc<dyn PaymentProvider>,
    config: BillingConfig,
    policy: FleetPolicy,
}

impl PaymentEngine {
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn PaymentProvider>,
        config: BillingConfig,
        policy: FleetPolicy,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            policy,
        }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Open a provider checkout for a robot that does not exist yet.
    ///
    /// The robot is only created once the provider reports the session paid.
    #[instrument(skip(self, user_email), fields(user_id = %user_id))]
    pub async fn create_checkout_request(
        &self,
        user_id: UserId,
        robot_name: &str,
        plan_type: &str,
        user_email: &str,
    ) -> Result<CheckoutSession, BillingError> {
        let plan_type = plan_type
            .parse::<PlanType>()
            .map_err(|e| BillingError::InvalidArgument(e.to_string()))?;
        let price_id = self.config.get_price_id(plan_type).ok_or_else(|| {
            BillingError::InvalidArgument(format!("no price configured for plan '{plan_type}'"))
        })?;
        let robot_name = registry::validate_robot_name(robot_name)?;

        {
            let mut tx = self.store.begin().await?;
            if tx.find_robot_by_name(robot_name).await?.is_some() {
                return Err(BillingError::Conflict(format!(
                    "robot '{robot_name}' already exists"
                )));
            }
        }

        let metadata = PaymentMetadata {
            user_id,
            robot_name: robot_name.to_string(),
            plan_type,
        };
        let session = self
            .provider
            .create_checkout_session(&CheckoutRequest {
                price_id: price_id.to_string(),
                customer_email: user_email.to_string(),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
                metadata: metadata.clone(),
            })
            .await?;

        let encoded = serde_json::to_string(&metadata)
            .map_err(|e| BillingError::Internal(format!("metadata encoding failed: {e}")))?;

        let mut tx = self.store.begin().await?;
        let payment = tx
            .create_payment(CreatePayment {
                id: Uuid::new_v4(),
                user_id: user_id.0,
                amount: plan_type.amount_cents(),
                currency: DEFAULT_CURRENCY.to_string(),
                provider: PaymentProviderKind::Stripe.as_str().to_string(),
                provider_session_id: session.session_id.clone(),
                metadata: encoded,
            })
            .await?;
        tx.commit().await?;

        info!(
            payment_id = %payment.id,
            session_id = %session.session_id,
            amount = payment.amount,
            "Checkout created"
        );
        Ok(session)
    }

    // =========================================================================
    // Webhook events
    // =========================================================================

    /// Apply a verified provider event.
    ///
    /// The event ID is recorded in the same transaction as its effects, so a
    /// redelivery returns [`Outcome::AlreadyApplied`] and changes nothing.
    #[instrument(skip(self, event), fields(event_id = %event.id, event_type = %event.event_type))]
    pub async fn handle_event(&self, event: &WebhookEvent) -> Result<Outcome, BillingError> {
        let now = Utc::now();

        // Provider calls stay outside the transaction
        let period = match (&event.event_type, &event.data) {
            (WebhookEventType::CheckoutSessionCompleted, WebhookEventData::CheckoutSession(s)) => {
                match &s.subscription_id {
                    Some(sub_id) => Some(self.provider.get_subscription_period(sub_id).await?),
                    None => None,
                }
            }
            _ => None,
        };

        let mut tx = self.store.begin().await?;

        if !tx
            .record_webhook_event(&event.id, event.event_type.as_str())
            .await?
        {
            debug!("Event already processed");
            return Ok(Outcome::AlreadyApplied);
        }

        let outcome = match (&event.event_type, &event.data) {
            (WebhookEventType::CheckoutSessionCompleted, WebhookEventData::CheckoutSession(s)) => {
                self.complete_checkout(tx.as_mut(), s, period, now).await?
            }
            (
                WebhookEventType::CheckoutSessionAsyncPaymentFailed,
                WebhookEventData::CheckoutSession(s),
            ) => fail_checkout(tx.as_mut(), &s.session_id).await?,
            (WebhookEventType::InvoicePaymentSucceeded, WebhookEventData::Invoice(inv)) => {
                let extended = match &inv.subscription_id {
                    Some(sub_id) => {
                        ledger::extend_period(tx.as_mut(), sub_id, inv.period.start, inv.period.end)
                            .await?
                    }
                    None => false,
                };
                applied_if(extended)
            }
            (WebhookEventType::InvoicePaymentFailed, WebhookEventData::Invoice(inv)) => {
                let suspended = match &inv.subscription_id {
                    Some(sub_id) => ledger::suspend(tx.as_mut(), sub_id).await?,
                    None => false,
                };
                applied_if(suspended)
            }
            (WebhookEventType::CustomerSubscriptionUpdated, WebhookEventData::Subscription(sub)) => {
                let state = ProviderState {
                    status: SubscriptionStatus::from_provider(&sub.status),
                    period_start: sub.period_start,
                    period_end: sub.period_end,
                    cancel_at_period_end: sub.cancel_at_period_end,
                };
                let updated =
                    ledger::apply_provider_state(tx.as_mut(), &sub.subscription_id, state, now)
                        .await?;
                applied_if(updated.is_some())
            }
            (WebhookEventType::CustomerSubscriptionDeleted, WebhookEventData::Subscription(sub)) => {
                let canceled =
                    ledger::cancel_by_provider_id(tx.as_mut(), &sub.subscription_id, now).await?;
                applied_if(canceled)
            }
            (WebhookEventType::Unknown(_), _) => {
                debug!("Ignoring unhandled event type");
                Outcome::Ignored
            }
            (_, WebhookEventData::Raw(_)) => {
                warn!("Event payload unreadable, acknowledging without effect");
                Outcome::Ignored
            }
            _ => {
                warn!("Event data does not match its type");
                Outcome::Ignored
            }
        };

        tx.commit().await?;
        info!(outcome = outcome.as_str(), "Webhook event processed");
        Ok(outcome)
    }

    /// Settle a paid checkout session.
    ///
    /// The payment row stays locked until commit, so a concurrent delivery
    /// waits and then finds it completed with its robot linked.
    async fn complete_checkout(
        &self,
        tx: &mut dyn StoreTx,
        session: &CheckoutSessionData,
        period: Option<SubscriptionPeriod>,
        now: DateTime<Utc>,
    ) -> Result<Outcome, BillingError> {
        let payment = tx
            .lock_payment_by_session(&session.session_id)
            .await?
            .ok_or(BillingError::NotFound("payment"))?;

        // A payment completed by direct settlement may still lack its robot
        let status = payment.status();
        let settled = match status {
            PaymentStatus::Completed => payment.robot_id.is_some(),
            other => other.is_terminal(),
        };
        if settled {
            debug!(payment_id = %payment.id, status = %payment.status, "Payment already settled");
            return Ok(Outcome::AlreadyApplied);
        }

        tx.complete_payment(
            payment.id,
            PaymentCompletion {
                provider_customer_id: session.customer_id.clone(),
                provider_subscription_id: session.subscription_id.clone(),
                provider_payment_id: session.payment_intent_id.clone(),
            },
        )
        .await?;

        let owner = UserId(payment.user_id);
        let metadata = payment.metadata();
        let plan_type = metadata
            .as_ref()
            .map(|m| m.plan_type)
            .unwrap_or(PlanType::Basic);

        let robot_id = match payment.robot_id {
            Some(id) => {
                registry::set_status(tx, RobotId(id), RobotStatus::Active).await?;
                RobotId(id)
            }
            None => {
                let metadata = metadata.ok_or_else(|| {
                    BillingError::InvalidArgument("payment has no robot metadata".to_string())
                })?;
                let robot =
                    registry::create(tx, &metadata.robot_name, owner, RobotStatus::Active).await?;
                robot.robot_id()
            }
        };

        let plan = ledger::create_plan(
            tx,
            robot_id,
            owner,
            plan_type,
            Some(payment.id.to_string()),
            &self.policy,
            now,
        )
        .await?;
        tx.link_payment_robot(payment.id, robot_id.0, Some(plan.id))
            .await?;

        if let (Some(sub_id), Some(period)) = (&session.subscription_id, period) {
            ledger::upsert_subscription_from_provider(
                tx,
                &ProviderSubscription {
                    provider_subscription_id: sub_id.clone(),
                    provider_customer_id: session.customer_id.clone(),
                    period_start: period.start,
                    period_end: period.end,
                },
                owner,
                robot_id,
                plan_type,
            )
            .await?;
        }

        info!(payment_id = %payment.id, robot_id = %robot_id, "Checkout settled");
        Ok(Outcome::Applied)
    }

    // =========================================================================
    // Direct settlement
    // =========================================================================

    /// Mark the payment behind `session_id` completed and activate its robot
    #[instrument(skip(self))]
    pub async fn handle_payment_success(&self, session_id: &str) -> Result<Outcome, BillingError> {
        let mut tx = self.store.begin().await?;
        let payment = tx
            .lock_payment_by_session(session_id)
            .await?
            .ok_or(BillingError::NotFound("payment"))?;

        let outcome = settle(tx.as_mut(), &payment, PaymentStatus::Completed, RobotStatus::Active)
            .await?;
        tx.commit().await?;
        Ok(outcome)
    }

    /// Mark a payment failed and suspend its robot
    #[instrument(skip(self))]
    pub async fn handle_payment_failure(&self, payment_id: &str) -> Result<Outcome, BillingError> {
        let id = Uuid::parse_str(payment_id.trim()).map_err(|_| {
            BillingError::InvalidArgument(format!("invalid payment id '{payment_id}'"))
        })?;

        let mut tx = self.store.begin().await?;
        let payment = tx
            .lock_payment(id)
            .await?
            .ok_or(BillingError::NotFound("payment"))?;

        let outcome = settle(tx.as_mut(), &payment, PaymentStatus::Failed, RobotStatus::Suspended)
            .await?;
        tx.commit().await?;
        Ok(outcome)
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Stop a robot's subscription from renewing.
    ///
    /// The provider is told first; the local record keeps the subscription
    /// usable until its period ends. Robots of other owners read as absent.
    #[instrument(skip(self))]
    pub async fn cancel_subscription(
        &self,
        robot_id: RobotId,
        requesting_user: UserId,
    ) -> Result<SubscriptionRow, BillingError> {
        let now = Utc::now();

        let subscription = {
            let mut tx = self.store.begin().await?;
            registry::find_by_owner_and_id(tx.as_mut(), robot_id, requesting_user)
                .await?
                .ok_or(BillingError::NotFound("robot"))?;
            ledger::find_active_subscription(tx.as_mut(), robot_id, now)
                .await?
                .ok_or(BillingError::NotFound("subscription"))?
        };

        if let Some(provider_id) = &subscription.provider_subscription_id {
            self.provider
                .cancel_subscription_at_period_end(provider_id)
                .await?;
        }

        let mut tx = self.store.begin().await?;
        ledger::cancel(tx.as_mut(), subscription.id, true, now).await?;
        let updated = tx
            .find_subscription_by_id(subscription.id)
            .await?
            .ok_or(BillingError::NotFound("subscription"))?;
        tx.commit().await?;

        Ok(updated)
    }
}

/// Events about subscriptions we never recorded are acknowledged without effect
fn applied_if(changed: bool) -> Outcome {
    if changed {
        Outcome::Applied
    } else {
        Outcome::Ignored
    }
}

/// Fail the pending payment behind a checkout session
async fn fail_checkout(tx: &mut dyn StoreTx, session_id: &str) -> Result<Outcome, BillingError> {
    let payment = tx
        .lock_payment_by_session(session_id)
        .await?
        .ok_or(BillingError::NotFound("payment"))?;

    if !payment.status().can_transition_to(PaymentStatus::Failed) {
        return Ok(Outcome::AlreadyApplied);
    }
    tx.set_payment_status(payment.id, PaymentStatus::Failed.as_str())
        .await?;
    info!(payment_id = %payment.id, "Checkout payment failed");
    Ok(Outcome::Applied)
}

/// Move a pending payment to `status` and its linked robot, if any, to `robot_status`
async fn settle(
    tx: &mut dyn StoreTx,
    payment: &PaymentRow,
    status: PaymentStatus,
    robot_status: RobotStatus,
) -> Result<Outcome, BillingError> {
    if !payment.status().can_transition_to(status) {
        debug!(payment_id = %payment.id, current = %payment.status, "Payment already settled");
        return Ok(Outcome::AlreadyApplied);
    }

    tx.set_payment_status(payment.id, status.as_str()).await?;
    if let Some(robot_id) = payment.robot_id {
        registry::set_status(tx, RobotId(robot_id), robot_status).await?;
    }

    info!(payment_id = %payment.id, status = %status, "Payment settled");
    Ok(Outcome::Applied)
}
