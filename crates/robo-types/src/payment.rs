//! Payment and checkout types

use serde::{Deserialize, Serialize};

use crate::{ParseEnumError, PlanType, UserId};

/// Currency every checkout is priced in
pub const DEFAULT_CURRENCY: &str = "BRL";

/// Payment status
///
/// `Pending` is the only non-terminal state. A payment moves out of it
/// exactly once and never comes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Checkout requested, awaiting the provider
    Pending,
    /// Provider confirmed the payment
    Completed,
    /// Provider reported a failure
    Failed,
    /// Checkout abandoned or canceled
    Canceled,
    /// Money returned to the customer
    Refunded,
}

impl PaymentStatus {
    /// Stored string form
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Refunded => "refunded",
        }
    }

    /// Whether no further transition is allowed
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether moving to `next` is a legal one-way transition
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        *self == Self::Pending && next != Self::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "canceled" => Ok(Self::Canceled),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ParseEnumError::new("payment status", s)),
        }
    }
}

/// Payment provider a payment was taken through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProviderKind {
    /// Stripe
    Stripe,
}

impl PaymentProviderKind {
    /// Stored string form
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
        }
    }
}

impl std::fmt::Display for PaymentProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata attached to a checkout session and persisted on the payment.
///
/// This is the only durable link between a paid session and the robot
/// that must be created once payment completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    /// Buyer
    pub user_id: UserId,
    /// Name the robot will be registered under
    pub robot_name: String,
    /// Purchased tier
    pub plan_type: PlanType,
}

/// Checkout session handle returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider checkout session ID
    pub session_id: String,
    /// Checkout URL to redirect the user to
    pub url: String,
}
