//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.
//! Enum-valued columns are stored as text and exposed through typed accessors.

use chrono::{DateTime, Utc};
use robo_types::{
    PaymentMetadata, PaymentStatus, PlanType, RobotId, RobotStatus, SubscriptionStatus, UserId,
};
use sqlx::FromRow;
use uuid::Uuid;

/// User row from the database
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub messages_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Robot row from the database
#[derive(Debug, Clone, FromRow)]
pub struct RobotRow {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub status: String,
    pub activated_at: Option<DateTime<Utc>>,
    /// Cached projection of the active plans' latest expiry. Not authoritative.
    pub plan_valid_until: Option<DateTime<Utc>>,
    pub last_ping: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Plan row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PlanRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub robot_id: Uuid,
    pub plan_type: String,
    pub initiated_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
    pub active: bool,
    pub payment_id: Option<String>,
}

/// Subscription row from the database
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub robot_id: Uuid,
    pub plan_type: String,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub provider_subscription_id: Option<String>,
    pub provider_customer_id: Option<String>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment row from the database
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub robot_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    /// Amount in minor currency units
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub provider: String,
    pub provider_payment_id: Option<String>,
    pub provider_customer_id: Option<String>,
    pub provider_session_id: Option<String>,
    pub provider_subscription_id: Option<String>,
    /// JSON-encoded [`PaymentMetadata`]
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Conversation log row from the database
#[derive(Debug, Clone, FromRow)]
pub struct ConversationLogRow {
    pub id: Uuid,
    pub robot_id: Uuid,
    pub question: String,
    pub answer: String,
    pub mood: String,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

// Conversion helpers from rows to robo-types domain types

impl UserRow {
    /// Convert to domain UserId
    pub fn user_id(&self) -> UserId {
        UserId(self.id)
    }
}

impl RobotRow {
    /// Convert to domain RobotId
    pub fn robot_id(&self) -> RobotId {
        RobotId(self.id)
    }

    /// Owner as a domain UserId
    pub fn owner_id(&self) -> UserId {
        UserId(self.user_id)
    }

    /// Typed status. Unrecognized values read as suspended.
    pub fn status(&self) -> RobotStatus {
        self.status.parse().unwrap_or(RobotStatus::Suspended)
    }
}

impl PlanRow {
    /// Typed plan tier. Unrecognized values read as basic.
    pub fn plan_type(&self) -> PlanType {
        self.plan_type.parse().unwrap_or(PlanType::Basic)
    }
}

impl SubscriptionRow {
    /// Typed status. Unrecognized values read as inactive.
    pub fn status(&self) -> SubscriptionStatus {
        self.status.parse().unwrap_or(SubscriptionStatus::Inactive)
    }
}

impl PaymentRow {
    /// Typed status. Unrecognized values read as canceled so no transition fires.
    pub fn status(&self) -> PaymentStatus {
        self.status.parse().unwrap_or(PaymentStatus::Canceled)
    }

    /// Decode the stored checkout metadata
    pub fn metadata(&self) -> Option<PaymentMetadata> {
        let raw = self.metadata.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(meta) => Some(meta),
            Err(e) => {
                tracing::warn!(payment_id = %self.id, error = %e, "Unreadable payment metadata");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment(metadata: Option<&str>, status: &str) -> PaymentRow {
        PaymentRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            robot_id: None,
            plan_id: None,
            amount: 2990,
            currency: "BRL".to_string(),
            status: status.to_string(),
            provider: "stripe".to_string(),
            provider_payment_id: None,
            provider_customer_id: None,
            provider_session_id: Some("cs_test".to_string()),
            provider_subscription_id: None,
            metadata: metadata.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_payment_metadata_decodes() {
        let user = Uuid::new_v4();
        let raw = format!(r#"{{"user_id":"{user}","robot_name":"bot1","plan_type":"premium"}}"#);
        let meta = payment(Some(&raw), "pending").metadata().unwrap();
        assert_eq!(meta.robot_name, "bot1");
        assert_eq!(meta.plan_type, PlanType::Premium);
        assert_eq!(meta.user_id, UserId(user));
    }

    #[test]
    fn test_garbled_metadata_is_none() {
        assert!(payment(Some("{not json"), "pending").metadata().is_none());
        assert!(payment(None, "pending").metadata().is_none());
    }

    #[test]
    fn test_unknown_payment_status_is_terminal() {
        assert!(payment(None, "weird").status().is_terminal());
        assert_eq!(payment(None, "pending").status(), PaymentStatus::Pending);
    }
}
