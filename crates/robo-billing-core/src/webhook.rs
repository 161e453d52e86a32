//! Stripe webhook verification and parsing

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, info, instrument, warn};

use crate::error::BillingError;
use crate::provider::SubscriptionPeriod;
use crate::stripe::{from_unix, StripeInvoice, StripeSubscription};

/// Maximum age of a signed delivery, in seconds
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Webhook event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEventType {
    /// Checkout session completed
    CheckoutSessionCompleted,
    /// Delayed payment method (e.g. pix) failed after checkout
    CheckoutSessionAsyncPaymentFailed,
    /// Renewal invoice paid
    InvoicePaymentSucceeded,
    /// Renewal invoice payment failed
    InvoicePaymentFailed,
    /// Customer subscription updated
    CustomerSubscriptionUpdated,
    /// Customer subscription deleted
    CustomerSubscriptionDeleted,
    /// Unknown event type
    Unknown(String),
}

impl WebhookEventType {
    /// Provider's name for the event
    pub fn as_str(&self) -> &str {
        match self {
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionAsyncPaymentFailed => "checkout.session.async_payment_failed",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::Unknown(other) => other,
        }
    }
}

impl From<&str> for WebhookEventType {
    fn from(s: &str) -> Self {
        match s {
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.async_payment_failed" => Self::CheckoutSessionAsyncPaymentFailed,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed webhook event
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Event ID
    pub id: String,
    /// Event type
    pub event_type: WebhookEventType,
    /// Event data
    pub data: WebhookEventData,
    /// When the event was created (Unix timestamp)
    pub created: i64,
}

/// Webhook event data
#[derive(Debug, Clone)]
pub enum WebhookEventData {
    /// Checkout session data
    CheckoutSession(CheckoutSessionData),
    /// Subscription data
    Subscription(SubscriptionData),
    /// Invoice data
    Invoice(InvoiceData),
    /// Raw JSON for unknown events and unreadable payloads
    Raw(serde_json::Value),
}

/// Checkout session data
#[derive(Debug, Clone)]
pub struct CheckoutSessionData {
    /// Session ID
    pub session_id: String,
    /// Customer ID
    pub customer_id: Option<String>,
    /// Subscription ID
    pub subscription_id: Option<String>,
    /// Payment intent ID
    pub payment_intent_id: Option<String>,
}

/// Subscription event data
#[derive(Debug, Clone)]
pub struct SubscriptionData {
    /// Subscription ID
    pub subscription_id: String,
    /// Customer ID
    pub customer_id: String,
    /// Provider status
    pub status: String,
    /// Current period start
    pub period_start: DateTime<Utc>,
    /// Current period end
    pub period_end: DateTime<Utc>,
    /// Whether it cancels at period end
    pub cancel_at_period_end: bool,
}

/// Invoice event data
#[derive(Debug, Clone)]
pub struct InvoiceData {
    /// Invoice ID
    pub invoice_id: String,
    /// Subscription the invoice bills for
    pub subscription_id: Option<String>,
    /// Billed period
    pub period: SubscriptionPeriod,
}

/// Compute the `v1` signature Stripe sends for `payload` at `timestamp`
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, BillingError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::Internal("HMAC error".to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies and parses signed webhook deliveries
#[derive(Clone)]
pub struct WebhookVerifier {
    webhook_secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    /// Create a new webhook verifier
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            webhook_secret: webhook_secret.into(),
            tolerance_secs: SIGNATURE_TOLERANCE_SECS,
        }
    }

    /// Verify and parse a webhook payload
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, BillingError> {
        self.verify_and_parse_at(payload, signature, Utc::now().timestamp())
    }

    /// Verify and parse a webhook payload against a given clock
    #[instrument(skip(self, payload, signature))]
    pub fn verify_and_parse_at(
        &self,
        payload: &[u8],
        signature: &str,
        now: i64,
    ) -> Result<WebhookEvent, BillingError> {
        self.verify_signature(payload, signature, now)?;

        let raw_event: RawStripeEvent = serde_json::from_slice(payload)
            .map_err(|e| BillingError::WebhookError(e.to_string()))?;

        debug!(event_id = %raw_event.id, event_type = %raw_event.event_type, "Parsed webhook event");

        let event_type = WebhookEventType::from(raw_event.event_type.as_str());
        let data = parse_event_data(&event_type, raw_event.data.object)?;

        Ok(WebhookEvent {
            id: raw_event.id,
            event_type,
            data,
            created: raw_event.created,
        })
    }

    /// Verify a `t=<ts>,v1=<hex>[,v1=<hex>...]` signature header
    fn verify_signature(&self, payload: &[u8], header: &str, now: i64) -> Result<(), BillingError> {
        let mut timestamp: Option<&str> = None;
        let mut candidates: Vec<&str> = Vec::new();

        for part in header.split(',') {
            if let Some((key, value)) = part.trim().split_once('=') {
                match key {
                    "t" => timestamp = Some(value),
                    "v1" => candidates.push(value),
                    _ => {}
                }
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            warn!("Missing timestamp in webhook signature");
            BillingError::WebhookError("Missing timestamp".to_string())
        })?;
        let ts: i64 = timestamp
            .parse()
            .map_err(|_| BillingError::WebhookError("Invalid timestamp format".to_string()))?;

        if candidates.is_empty() {
            warn!("Missing v1 signature in webhook signature");
            return Err(BillingError::WebhookError("Missing signature".to_string()));
        }

        let expected = compute_signature(&self.webhook_secret, ts, payload)?;
        let matched = candidates
            .iter()
            .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));
        if !matched {
            warn!("Webhook signature verification failed");
            return Err(BillingError::WebhookError(
                "Signature verification failed".to_string(),
            ));
        }

        if (now - ts).abs() > self.tolerance_secs {
            warn!(timestamp = ts, now = now, "Webhook timestamp outside tolerance");
            return Err(BillingError::WebhookError("Timestamp too old".to_string()));
        }

        Ok(())
    }
}

/// Parse event data based on type.
///
/// Only a checkout session of unexpected shape is an error. Invoice and
/// subscription payloads that cannot be read fall back to [`WebhookEventData::Raw`].
fn parse_event_data(
    event_type: &WebhookEventType,
    object: serde_json::Value,
) -> Result<WebhookEventData, BillingError> {
    match event_type {
        WebhookEventType::CheckoutSessionCompleted
        | WebhookEventType::CheckoutSessionAsyncPaymentFailed => {
            let session: RawCheckoutSession = serde_json::from_value(object)
                .map_err(|e| BillingError::WebhookError(e.to_string()))?;
            Ok(WebhookEventData::CheckoutSession(CheckoutSessionData {
                session_id: session.id,
                customer_id: session.customer,
                subscription_id: session.subscription,
                payment_intent_id: session.payment_intent,
            }))
        }
        WebhookEventType::CustomerSubscriptionUpdated
        | WebhookEventType::CustomerSubscriptionDeleted => {
            match serde_json::from_value::<StripeSubscription>(object.clone()) {
                Ok(sub) => match sub.period() {
                    Ok(period) => Ok(WebhookEventData::Subscription(SubscriptionData {
                        subscription_id: sub.id,
                        customer_id: sub.customer,
                        status: sub.status,
                        period_start: period.start,
                        period_end: period.end,
                        cancel_at_period_end: sub.cancel_at_period_end,
                    })),
                    Err(e) => {
                        warn!(error = %e, "Subscription period unreadable");
                        Ok(WebhookEventData::Raw(object))
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Subscription payload of unexpected shape");
                    Ok(WebhookEventData::Raw(object))
                }
            }
        }
        WebhookEventType::InvoicePaymentSucceeded | WebhookEventType::InvoicePaymentFailed => {
            let invoice = serde_json::from_value::<StripeInvoice>(object.clone())
                .map_err(|e| e.to_string())
                .and_then(|inv| {
                    let period = inv.billed_period().map_err(|e| e.to_string())?;
                    Ok(InvoiceData {
                        invoice_id: inv.id,
                        subscription_id: inv.subscription,
                        period,
                    })
                });
            match invoice {
                Ok(data) => Ok(WebhookEventData::Invoice(data)),
                Err(e) => {
                    warn!(error = %e, "Invoice payload of unexpected shape");
                    Ok(WebhookEventData::Raw(object))
                }
            }
        }
        WebhookEventType::Unknown(kind) => {
            info!(event_type = %kind, "Received unknown webhook event type");
            Ok(WebhookEventData::Raw(object))
        }
    }
}

// Raw Stripe event for parsing
#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    #[serde(default)]
    created: i64,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawCheckoutSession {
    id: String,
    customer: Option<String>,
    subscription: Option<String>,
    payment_intent: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SECRET: &str = "whsec_test";
    const NOW: i64 = 1_700_000_000;

    fn signed(payload: &[u8], ts: i64) -> String {
        format!("t={ts},v1={}", compute_signature(SECRET, ts, payload).unwrap())
    }

    fn completed_payload() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "created": NOW,
            "data": { "object": { "id": "cs_1", "customer": "cus_1", "subscription": "sub_1" } }
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_signature_parses() {
        let payload = completed_payload();
        let event = WebhookVerifier::new(SECRET)
            .verify_and_parse_at(&payload, &signed(&payload, NOW), NOW)
            .unwrap();

        assert_eq!(event.id, "evt_1");
        assert_eq!(event.event_type, WebhookEventType::CheckoutSessionCompleted);
        match event.data {
            WebhookEventData::CheckoutSession(data) => {
                assert_eq!(data.session_id, "cs_1");
                assert_eq!(data.subscription_id.as_deref(), Some("sub_1"));
            }
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let payload = completed_payload();
        let valid = compute_signature(SECRET, NOW, &payload).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={valid}");
        assert!(WebhookVerifier::new(SECRET)
            .verify_and_parse_at(&payload, &header, NOW)
            .is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = completed_payload();
        let header = format!("t={NOW},v1={}", compute_signature("other", NOW, &payload).unwrap());
        let err = WebhookVerifier::new(SECRET)
            .verify_and_parse_at(&payload, &header, NOW)
            .unwrap_err();
        assert!(matches!(err, BillingError::WebhookError(_)));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let payload = completed_payload();
        let header = signed(&payload, NOW);
        let mut tampered = payload.clone();
        tampered.extend_from_slice(b" ");
        assert!(WebhookVerifier::new(SECRET)
            .verify_and_parse_at(&tampered, &header, NOW)
            .is_err());
    }

    #[test]
    fn test_tolerance_window() {
        let payload = completed_payload();
        let verifier = WebhookVerifier::new(SECRET);
        let ts = NOW - SIGNATURE_TOLERANCE_SECS;
        assert!(verifier.verify_and_parse_at(&payload, &signed(&payload, ts), NOW).is_ok());
        let ts = NOW - SIGNATURE_TOLERANCE_SECS - 1;
        assert!(verifier.verify_and_parse_at(&payload, &signed(&payload, ts), NOW).is_err());
    }

    #[test]
    fn test_malformed_headers_rejected() {
        let payload = completed_payload();
        let verifier = WebhookVerifier::new(SECRET);
        for header in ["", "v1=abc", "t=abc,v1=abc", &format!("t={NOW}")] {
            assert!(verifier.verify_and_parse_at(&payload, header, NOW).is_err());
        }
    }

    #[test]
    fn test_unknown_type_is_raw() {
        let payload = serde_json::to_vec(&json!({
            "id": "evt_2",
            "type": "charge.refunded",
            "created": NOW,
            "data": { "object": { "id": "ch_1" } }
        }))
        .unwrap();
        let event = WebhookVerifier::new(SECRET)
            .verify_and_parse_at(&payload, &signed(&payload, NOW), NOW)
            .unwrap();
        assert_eq!(event.event_type, WebhookEventType::Unknown("charge.refunded".into()));
        assert!(matches!(event.data, WebhookEventData::Raw(_)));
    }

    #[test]
    fn test_odd_invoice_shape_does_not_fail() {
        let payload = serde_json::to_vec(&json!({
            "id": "evt_3",
            "type": "invoice.payment_succeeded",
            "created": NOW,
            "data": { "object": { "unexpected": true } }
        }))
        .unwrap();
        let event = WebhookVerifier::new(SECRET)
            .verify_and_parse_at(&payload, &signed(&payload, NOW), NOW)
            .unwrap();
        assert!(matches!(event.data, WebhookEventData::Raw(_)));
    }

    #[test]
    fn test_malformed_checkout_session_is_error() {
        let payload = serde_json::to_vec(&json!({
            "id": "evt_4",
            "type": "checkout.session.completed",
            "created": NOW,
            "data": { "object": { "no_id": true } }
        }))
        .unwrap();
        assert!(WebhookVerifier::new(SECRET)
            .verify_and_parse_at(&payload, &signed(&payload, NOW), NOW)
            .is_err());
    }
}
