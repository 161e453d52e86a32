//! Subscription types

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

/// Local subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Created but not yet confirmed by the provider
    Pending,
    /// Subscription is active
    Active,
    /// Renewal payment failed
    Inactive,
    /// Subscription was canceled
    Canceled,
    /// Period ended without renewal
    Expired,
}

impl SubscriptionStatus {
    /// Stored string form
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
        }
    }

    /// Map a provider-side subscription status onto the local set.
    ///
    /// Statuses with no local counterpart collapse to `Inactive`.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" | "trialing" => Self::Active,
            "canceled" => Self::Canceled,
            "incomplete" => Self::Pending,
            "incomplete_expired" => Self::Expired,
            _ => Self::Inactive,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "canceled" => Ok(Self::Canceled),
            "expired" => Ok(Self::Expired),
            _ => Err(ParseEnumError::new("subscription status", s)),
        }
    }
}
