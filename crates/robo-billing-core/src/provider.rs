//! Payment provider abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use robo_types::PaymentMetadata;

use crate::{BillingError, CheckoutSession};

/// Everything the provider needs to open a checkout session
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Provider price ID of the purchased tier
    pub price_id: String,
    /// Buyer email, prefilled on the checkout page
    pub customer_email: String,
    /// Redirect after payment
    pub success_url: String,
    /// Redirect after abandonment
    pub cancel_url: String,
    /// Echoed back on completion
    pub metadata: PaymentMetadata,
}

/// Billing window of a provider subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Payment provider trait
///
/// Abstracts the provider's API so the engine can be tested without network access.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a checkout session
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError>;

    /// Fetch the current billing window of a subscription
    async fn get_subscription_period(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionPeriod, BillingError>;

    /// Stop a subscription from renewing at the end of its current period
    async fn cancel_subscription_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<(), BillingError>;
}
