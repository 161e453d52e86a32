//! Billing configuration

use std::collections::HashMap;

use robo_types::PlanType;

/// Stripe REST API root
pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Billing service configuration
#[derive(Clone)]
pub struct BillingConfig {
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook secret
    pub stripe_webhook_secret: String,
    /// Map of plan tiers to Stripe price IDs
    pub price_ids: HashMap<PlanType, String>,
    /// Where the provider sends the buyer after paying
    pub success_url: String,
    /// Where the provider sends the buyer after abandoning checkout
    pub cancel_url: String,
    /// API root, overridable for test doubles
    pub api_base: String,
}

impl BillingConfig {
    /// Create a new billing config
    pub fn new(
        stripe_secret_key: impl Into<String>,
        stripe_webhook_secret: impl Into<String>,
    ) -> Self {
        Self {
            stripe_secret_key: stripe_secret_key.into(),
            stripe_webhook_secret: stripe_webhook_secret.into(),
            price_ids: HashMap::new(),
            success_url: "http://localhost:8080/payments/success".to_string(),
            cancel_url: "http://localhost:8080/payments/cancel".to_string(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    /// Set price ID for a plan tier
    pub fn with_price(mut self, plan_type: PlanType, price_id: impl Into<String>) -> Self {
        self.price_ids.insert(plan_type, price_id.into());
        self
    }

    /// Set redirect URLs
    pub fn with_urls(
        mut self,
        success_url: impl Into<String>,
        cancel_url: impl Into<String>,
    ) -> Self {
        self.success_url = success_url.into();
        self.cancel_url = cancel_url.into();
        self
    }

    /// Point the client at a different API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Get price ID for a plan tier
    pub fn get_price_id(&self, plan_type: PlanType) -> Option<&str> {
        self.price_ids.get(&plan_type).map(String::as_str)
    }
}

impl std::fmt::Debug for BillingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingConfig")
            .field("stripe_secret_key", &"[REDACTED]")
            .field("stripe_webhook_secret", &"[REDACTED]")
            .field("price_ids", &self.price_ids)
            .field("success_url", &self.success_url)
            .field("cancel_url", &self.cancel_url)
            .field("api_base", &self.api_base)
            .finish()
    }
}
