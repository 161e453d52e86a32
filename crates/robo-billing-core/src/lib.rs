//! Robo Billing Core - Payment reconciliation
//!
//! Turns checkout requests into provider sessions and maps the provider's
//! webhook stream onto local payments, robots, plans and subscriptions.
//!
//! # Example
//!
//! ```rust,ignore
//! use robo_billing_core::{BillingConfig, PaymentEngine, StripeProvider, WebhookVerifier};
//! use robo_types::PlanType;
//!
//! let config = BillingConfig::new("sk_test_...", "whsec_...")
//!     .with_price(PlanType::Basic, "price_...");
//!
//! let provider = Arc::new(StripeProvider::new(config.clone()));
//! let engine = PaymentEngine::new(store, provider, config.clone(), FleetPolicy::default());
//!
//! // Start a checkout
//! let session = engine.create_checkout_request(user_id, "bot1", "basic", "alice@x.com").await?;
//!
//! // Later, from the webhook endpoint
//! let event = WebhookVerifier::new(&config.stripe_webhook_secret).verify_and_parse(body, sig)?;
//! engine.handle_event(&event).await?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod provider;
pub mod stripe;
pub mod webhook;

pub use config::BillingConfig;
pub use engine::{Outcome, PaymentEngine};
pub use error::BillingError;
pub use provider::{CheckoutRequest, PaymentProvider, SubscriptionPeriod};
pub use stripe::StripeProvider;
pub use webhook::{
    compute_signature, CheckoutSessionData, InvoiceData, SubscriptionData, WebhookEvent,
    WebhookEventData, WebhookEventType, WebhookVerifier,
};

// Re-export checkout types from robo-types for convenience
pub use robo_types::CheckoutSession;
