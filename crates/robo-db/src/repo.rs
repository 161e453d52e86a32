//! Repository traits
//!
//! Define async repository interfaces for database operations. All of them are
//! implemented by a transaction handle, so any combination of calls made on one
//! [`StoreTx`] commits or rolls back together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::*;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send {
    /// Find a user by ID
    async fn find_user_by_id(&mut self, id: Uuid) -> DbResult<Option<UserRow>>;

    /// Find a user by email
    async fn find_user_by_email(&mut self, email: &str) -> DbResult<Option<UserRow>>;

    /// Find a user by ID and lock the row until the transaction ends
    async fn lock_user(&mut self, id: Uuid) -> DbResult<Option<UserRow>>;

    /// Create a new user
    async fn create_user(&mut self, user: CreateUser) -> DbResult<UserRow>;

    /// Increment the message counter by one, returning the new value
    async fn increment_messages_used(&mut self, id: Uuid) -> DbResult<i64>;
}

/// Create user input
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Robot repository trait
#[async_trait]
pub trait RobotRepository: Send {
    /// Find a robot by ID
    async fn find_robot_by_id(&mut self, id: Uuid) -> DbResult<Option<RobotRow>>;

    /// Find a robot by its unique name
    async fn find_robot_by_name(&mut self, name: &str) -> DbResult<Option<RobotRow>>;

    /// Find a robot by ID, only if owned by `owner_id`
    async fn find_robot_by_owner_and_id(
        &mut self,
        id: Uuid,
        owner_id: Uuid,
    ) -> DbResult<Option<RobotRow>>;

    /// List all robots owned by a user, oldest first
    async fn list_robots_by_owner(&mut self, owner_id: Uuid) -> DbResult<Vec<RobotRow>>;

    /// Find a robot by ID and lock the row until the transaction ends
    async fn lock_robot(&mut self, id: Uuid) -> DbResult<Option<RobotRow>>;

    /// Create a new robot
    async fn create_robot(&mut self, robot: CreateRobot) -> DbResult<RobotRow>;

    /// Update robot status
    async fn set_robot_status(&mut self, id: Uuid, status: &str) -> DbResult<()>;

    /// Update the cached entitlement window
    async fn set_plan_valid_until(
        &mut self,
        id: Uuid,
        valid_until: Option<DateTime<Utc>>,
    ) -> DbResult<()>;

    /// Record a heartbeat
    async fn touch_last_ping(&mut self, id: Uuid, at: DateTime<Utc>) -> DbResult<()>;
}

/// Create robot input
#[derive(Debug, Clone)]
pub struct CreateRobot {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    pub status: String,
    pub activated_at: Option<DateTime<Utc>>,
}

/// Plan repository trait
#[async_trait]
pub trait PlanRepository: Send {
    /// Find the active plan for a robot
    async fn find_active_plan(&mut self, robot_id: Uuid) -> DbResult<Option<PlanRow>>;

    /// List every plan for a robot, newest first
    async fn list_plans_by_robot(&mut self, robot_id: Uuid) -> DbResult<Vec<PlanRow>>;

    /// Deactivate all active plans for a robot, returning how many changed
    async fn deactivate_plans(&mut self, robot_id: Uuid) -> DbResult<u64>;

    /// Create a new plan
    async fn create_plan(&mut self, plan: CreatePlan) -> DbResult<PlanRow>;
}

/// Create plan input
#[derive(Debug, Clone)]
pub struct CreatePlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub robot_id: Uuid,
    pub plan_type: String,
    pub initiated_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
    pub payment_id: Option<String>,
}

/// Subscription repository trait
#[async_trait]
pub trait SubscriptionRepository: Send {
    /// Find a subscription by ID
    async fn find_subscription_by_id(&mut self, id: Uuid) -> DbResult<Option<SubscriptionRow>>;

    /// Find a subscription by the provider's subscription ID
    async fn find_subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> DbResult<Option<SubscriptionRow>>;

    /// Find the newest subscription for a robot that is active at `now`
    async fn find_active_subscription(
        &mut self,
        robot_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<Option<SubscriptionRow>>;

    /// Find active subscriptions whose period ends in `[from, until)`
    async fn find_expiring_subscriptions(
        &mut self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<SubscriptionRow>>;

    /// Create a new subscription
    async fn create_subscription(&mut self, sub: CreateSubscription) -> DbResult<SubscriptionRow>;

    /// Overwrite status and period with provider-reported state
    async fn update_subscription_state(
        &mut self,
        id: Uuid,
        update: SubscriptionStateUpdate,
    ) -> DbResult<()>;

    /// Mark subscription for cancellation at period end
    async fn set_cancel_at_period_end(&mut self, id: Uuid, cancel: bool) -> DbResult<()>;

    /// Cancel subscription immediately
    async fn cancel_subscription(&mut self, id: Uuid, at: DateTime<Utc>) -> DbResult<()>;
}

/// Create subscription input
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub robot_id: Uuid,
    pub plan_type: String,
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub provider_subscription_id: Option<String>,
    pub provider_customer_id: Option<String>,
}

/// Provider-reported subscription state
#[derive(Debug, Clone)]
pub struct SubscriptionStateUpdate {
    pub status: String,
    pub current_period_start: DateTime<Utc>,
    pub current_period_end: DateTime<Utc>,
    pub cancel_at_period_end: bool,
    pub canceled_at: Option<DateTime<Utc>>,
}

/// Payment repository trait
#[async_trait]
pub trait PaymentRepository: Send {
    /// Find a payment by ID
    async fn find_payment_by_id(&mut self, id: Uuid) -> DbResult<Option<PaymentRow>>;

    /// Find a payment by ID and lock the row until the transaction ends
    async fn lock_payment(&mut self, id: Uuid) -> DbResult<Option<PaymentRow>>;

    /// Find a payment by provider session ID and lock the row
    async fn lock_payment_by_session(&mut self, session_id: &str)
        -> DbResult<Option<PaymentRow>>;

    /// Create a new payment
    async fn create_payment(&mut self, payment: CreatePayment) -> DbResult<PaymentRow>;

    /// Mark a payment completed and store the provider references
    async fn complete_payment(&mut self, id: Uuid, completion: PaymentCompletion) -> DbResult<()>;

    /// Update payment status
    async fn set_payment_status(&mut self, id: Uuid, status: &str) -> DbResult<()>;

    /// Backfill the robot (and plan) a payment paid for
    async fn link_payment_robot(
        &mut self,
        id: Uuid,
        robot_id: Uuid,
        plan_id: Option<Uuid>,
    ) -> DbResult<()>;
}

/// Create payment input
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub provider: String,
    pub provider_session_id: String,
    pub metadata: String,
}

/// Provider references recorded when a checkout completes
#[derive(Debug, Clone, Default)]
pub struct PaymentCompletion {
    pub provider_customer_id: Option<String>,
    pub provider_subscription_id: Option<String>,
    pub provider_payment_id: Option<String>,
}

/// Conversation log repository trait
#[async_trait]
pub trait ConversationLogRepository: Send {
    /// Append a log entry
    async fn append_conversation_log(
        &mut self,
        log: CreateConversationLog,
    ) -> DbResult<ConversationLogRow>;

    /// Count log entries for a robot
    async fn count_conversation_logs(&mut self, robot_id: Uuid) -> DbResult<i64>;
}

/// Create conversation log input
#[derive(Debug, Clone)]
pub struct CreateConversationLog {
    pub id: Uuid,
    pub robot_id: Uuid,
    pub question: String,
    pub answer: String,
    pub mood: String,
    pub cost: f64,
}

/// Processed webhook event ledger
#[async_trait]
pub trait WebhookEventRepository: Send {
    /// Record an event ID. Returns `false` if it was already recorded.
    async fn record_webhook_event(&mut self, event_id: &str, event_type: &str) -> DbResult<bool>;
}

/// A transaction spanning every repository.
///
/// Dropping the handle without committing rolls back all writes made through it.
#[async_trait]
pub trait StoreTx:
    UserRepository
    + RobotRepository
    + PlanRepository
    + SubscriptionRepository
    + PaymentRepository
    + ConversationLogRepository
    + WebhookEventRepository
    + Send
{
    /// Commit all writes
    async fn commit(self: Box<Self>) -> DbResult<()>;
}

/// Transactional store capability
#[async_trait]
pub trait Store: Send + Sync {
    /// Begin a new transaction
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>>;

    /// Check connectivity
    async fn ping(&self) -> DbResult<()>;
}
