//! Stripe payment provider implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::config::BillingConfig;
use crate::error::BillingError;
use crate::provider::{CheckoutRequest, PaymentProvider, SubscriptionPeriod};
use crate::CheckoutSession;

/// Stripe payment provider
#[derive(Clone)]
pub struct StripeProvider {
    client: Client,
    config: BillingConfig,
}

impl StripeProvider {
    /// Create a new Stripe provider
    pub fn new(config: BillingConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    /// Make authenticated request to Stripe
    async fn stripe_request<T: for<'de> Deserialize<'de>>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        form: Option<&[(&str, &str)]>,
    ) -> Result<T, BillingError> {
        let url = format!("{}{endpoint}", self.config.api_base);

        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.stripe_secret_key, Option::<&str>::None);

        if let Some(form_data) = form {
            request = request.form(form_data);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Stripe API request failed");
            BillingError::ProviderError(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Stripe API error");
            return Err(BillingError::ProviderError(format!(
                "Stripe API error: {status}"
            )));
        }

        response.json::<T>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Stripe response");
            BillingError::ProviderError(e.to_string())
        })
    }

    /// Get a subscription
    #[instrument(skip(self))]
    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, BillingError> {
        debug!(subscription_id = %subscription_id, "Getting Stripe subscription");

        self.stripe_request::<StripeSubscription>(
            reqwest::Method::GET,
            &format!("/subscriptions/{subscription_id}"),
            None,
        )
        .await
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    #[instrument(skip(self, request), fields(plan_type = %request.metadata.plan_type))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, BillingError> {
        debug!(robot_name = %request.metadata.robot_name, "Creating checkout session");

        let user_id = request.metadata.user_id.to_string();
        let plan_type = request.metadata.plan_type.as_str();
        let robot_name = request.metadata.robot_name.as_str();

        let form = [
            ("mode", "subscription"),
            ("payment_method_types[0]", "card"),
            ("payment_method_types[1]", "pix"),
            ("customer_email", request.customer_email.as_str()),
            ("success_url", request.success_url.as_str()),
            ("cancel_url", request.cancel_url.as_str()),
            ("line_items[0][price]", request.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("metadata[user_id]", user_id.as_str()),
            ("metadata[robot_name]", robot_name),
            ("metadata[plan_type]", plan_type),
            ("subscription_data[metadata][user_id]", user_id.as_str()),
            ("subscription_data[metadata][robot_name]", robot_name),
            ("subscription_data[metadata][plan_type]", plan_type),
        ];

        let session: StripeCheckoutSession = self
            .stripe_request(reqwest::Method::POST, "/checkout/sessions", Some(&form))
            .await?;

        Ok(CheckoutSession {
            session_id: session.id,
            url: session.url.unwrap_or_default(),
        })
    }

    #[instrument(skip(self))]
    async fn get_subscription_period(
        &self,
        subscription_id: &str,
    ) -> Result<SubscriptionPeriod, BillingError> {
        let sub = self.get_subscription(subscription_id).await?;
        sub.period()
    }

    #[instrument(skip(self))]
    async fn cancel_subscription_at_period_end(
        &self,
        subscription_id: &str,
    ) -> Result<(), BillingError> {
        debug!(subscription_id = %subscription_id, "Scheduling subscription cancellation");

        let form = [("cancel_at_period_end", "true")];
        let _: StripeSubscription = self
            .stripe_request(
                reqwest::Method::POST,
                &format!("/subscriptions/{subscription_id}"),
                Some(&form),
            )
            .await?;

        Ok(())
    }
}

/// Convert a Stripe Unix timestamp
pub(crate) fn from_unix(ts: i64) -> Result<DateTime<Utc>, BillingError> {
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| BillingError::ProviderError(format!("timestamp out of range: {ts}")))
}

// Stripe API response types

/// Stripe subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeSubscription {
    /// Subscription ID
    pub id: String,
    /// Customer ID
    pub customer: String,
    /// Subscription status
    pub status: String,
    /// Current period start (Unix timestamp)
    pub current_period_start: i64,
    /// Current period end (Unix timestamp)
    pub current_period_end: i64,
    /// Whether subscription cancels at period end
    #[serde(default)]
    pub cancel_at_period_end: bool,
}

impl StripeSubscription {
    /// Current billing window
    pub fn period(&self) -> Result<SubscriptionPeriod, BillingError> {
        Ok(SubscriptionPeriod {
            start: from_unix(self.current_period_start)?,
            end: from_unix(self.current_period_end)?,
        })
    }
}

/// Stripe checkout session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeCheckoutSession {
    /// Session ID
    pub id: String,
    /// Checkout URL
    pub url: Option<String>,
    /// Customer ID
    pub customer: Option<String>,
    /// Subscription ID (after completion)
    pub subscription: Option<String>,
    /// Payment intent (one-off payments only)
    pub payment_intent: Option<String>,
}

/// Stripe invoice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeInvoice {
    /// Invoice ID
    pub id: String,
    /// Subscription the invoice bills for
    pub subscription: Option<String>,
    /// Period start (Unix timestamp)
    pub period_start: i64,
    /// Period end (Unix timestamp)
    pub period_end: i64,
    /// Line items, which carry the billed service period
    #[serde(default)]
    pub lines: Option<StripeList<StripeInvoiceLine>>,
}

impl StripeInvoice {
    /// Service period billed by this invoice.
    ///
    /// Subscription invoices put the upcoming period on the line item; the
    /// top-level fields are a fallback.
    pub fn billed_period(&self) -> Result<SubscriptionPeriod, BillingError> {
        let line_period = self
            .lines
            .as_ref()
            .and_then(|lines| lines.data.first())
            .and_then(|line| line.period.as_ref());

        let (start, end) = match line_period {
            Some(p) => (p.start, p.end),
            None => (self.period_start, self.period_end),
        };
        Ok(SubscriptionPeriod {
            start: from_unix(start)?,
            end: from_unix(end)?,
        })
    }
}

/// Stripe invoice line item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeInvoiceLine {
    /// Billed period
    pub period: Option<StripePeriod>,
}

/// Stripe period object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripePeriod {
    pub start: i64,
    pub end: i64,
}

/// Stripe list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeList<T> {
    /// List data
    pub data: Vec<T>,
    /// Whether there are more items
    #[serde(default)]
    pub has_more: bool,
}
