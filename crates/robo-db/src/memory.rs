//! In-memory store
//!
//! A [`Store`] backed by plain vectors behind a single async mutex. A
//! transaction holds the mutex for its whole lifetime and works on a copy of
//! the state, which replaces the shared state on commit and is discarded on
//! drop. This serializes transactions the way row locks serialize the
//! conflicting ones in PostgreSQL, and it enforces the same unique keys as
//! the schema.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::*;
use crate::repo::*;

/// Table contents of a [`MemoryStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: Vec<UserRow>,
    pub robots: Vec<RobotRow>,
    pub plans: Vec<PlanRow>,
    pub subscriptions: Vec<SubscriptionRow>,
    pub payments: Vec<PaymentRow>,
    pub conversation_logs: Vec<ConversationLogRow>,
    pub webhook_events: Vec<(String, String)>,
}

/// In-memory [`Store`] for tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the committed state
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    /// Mutate committed state directly, bypassing constraints
    pub async fn seed<F>(&self, f: F)
    where
        F: FnOnce(&mut MemoryState),
    {
        f(&mut *self.state.lock().await);
    }

    /// Make `begin` and `ping` fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> DbResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> DbResult<Box<dyn StoreTx>> {
        self.check_available()?;
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryStoreTx { guard, work }))
    }

    async fn ping(&self) -> DbResult<()> {
        self.check_available()
    }
}

/// Open transaction over a [`MemoryStore`]
pub struct MemoryStoreTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryStoreTx {
    async fn commit(self: Box<Self>) -> DbResult<()> {
        let MemoryStoreTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStoreTx {
    async fn find_user_by_id(&mut self, id: Uuid) -> DbResult<Option<UserRow>> {
        Ok(self.work.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> DbResult<Option<UserRow>> {
        Ok(self.work.users.iter().find(|u| u.email == email).cloned())
    }

    async fn lock_user(&mut self, id: Uuid) -> DbResult<Option<UserRow>> {
        self.find_user_by_id(id).await
    }

    async fn create_user(&mut self, user: CreateUser) -> DbResult<UserRow> {
        if self.work.users.iter().any(|u| u.email == user.email) {
            return Err(DbError::UniqueViolation("users_email_key".to_string()));
        }
        let now = Utc::now();
        let row = UserRow {
            id: user.id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            messages_used: 0,
            created_at: now,
            updated_at: now,
        };
        self.work.users.push(row.clone());
        Ok(row)
    }

    async fn increment_messages_used(&mut self, id: Uuid) -> DbResult<i64> {
        let user = self
            .work
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(DbError::NotFound)?;
        user.messages_used += 1;
        user.updated_at = Utc::now();
        Ok(user.messages_used)
    }
}

#[async_trait]
impl RobotRepository for MemoryStoreTx {
    async fn find_robot_by_id(&mut self, id: Uuid) -> DbResult<Option<RobotRow>> {
        Ok(self.work.robots.iter().find(|r| r.id == id).cloned())
    }

    async fn find_robot_by_name(&mut self, name: &str) -> DbResult<Option<RobotRow>> {
        Ok(self.work.robots.iter().find(|r| r.name == name).cloned())
    }

    async fn find_robot_by_owner_and_id(
        &mut self,
        id: Uuid,
        owner_id: Uuid,
    ) -> DbResult<Option<RobotRow>> {
        Ok(self
            .work
            .robots
            .iter()
            .find(|r| r.id == id && r.user_id == owner_id)
            .cloned())
    }

    async fn list_robots_by_owner(&mut self, owner_id: Uuid) -> DbResult<Vec<RobotRow>> {
        Ok(self
            .work
            .robots
            .iter()
            .filter(|r| r.user_id == owner_id)
            .cloned()
            .collect())
    }

    async fn lock_robot(&mut self, id: Uuid) -> DbResult<Option<RobotRow>> {
        self.find_robot_by_id(id).await
    }

    async fn create_robot(&mut self, robot: CreateRobot) -> DbResult<RobotRow> {
        if self.work.robots.iter().any(|r| r.name == robot.name) {
            return Err(DbError::UniqueViolation("robots_name_key".to_string()));
        }
        let row = RobotRow {
            id: robot.id,
            name: robot.name,
            user_id: robot.user_id,
            status: robot.status,
            activated_at: robot.activated_at,
            plan_valid_until: None,
            last_ping: None,
            created_at: Utc::now(),
        };
        self.work.robots.push(row.clone());
        Ok(row)
    }

    async fn set_robot_status(&mut self, id: Uuid, status: &str) -> DbResult<()> {
        if let Some(robot) = self.work.robots.iter_mut().find(|r| r.id == id) {
            robot.status = status.to_string();
        }
        Ok(())
    }

    async fn set_plan_valid_until(
        &mut self,
        id: Uuid,
        valid_until: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        if let Some(robot) = self.work.robots.iter_mut().find(|r| r.id == id) {
            robot.plan_valid_until = valid_until;
        }
        Ok(())
    }

    async fn touch_last_ping(&mut self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        if let Some(robot) = self.work.robots.iter_mut().find(|r| r.id == id) {
            robot.last_ping = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl PlanRepository for MemoryStoreTx {
    async fn find_active_plan(&mut self, robot_id: Uuid) -> DbResult<Option<PlanRow>> {
        Ok(self
            .work
            .plans
            .iter()
            .filter(|p| p.robot_id == robot_id && p.active)
            .max_by_key(|p| p.expired_at)
            .cloned())
    }

    async fn list_plans_by_robot(&mut self, robot_id: Uuid) -> DbResult<Vec<PlanRow>> {
        Ok(self
            .work
            .plans
            .iter()
            .rev()
            .filter(|p| p.robot_id == robot_id)
            .cloned()
            .collect())
    }

    async fn deactivate_plans(&mut self, robot_id: Uuid) -> DbResult<u64> {
        let mut changed = 0;
        for plan in self
            .work
            .plans
            .iter_mut()
            .filter(|p| p.robot_id == robot_id && p.active)
        {
            plan.active = false;
            changed += 1;
        }
        Ok(changed)
    }

    async fn create_plan(&mut self, plan: CreatePlan) -> DbResult<PlanRow> {
        if self
            .work
            .plans
            .iter()
            .any(|p| p.robot_id == plan.robot_id && p.active)
        {
            return Err(DbError::UniqueViolation(
                "plans_one_active_per_robot".to_string(),
            ));
        }
        let row = PlanRow {
            id: plan.id,
            user_id: plan.user_id,
            robot_id: plan.robot_id,
            plan_type: plan.plan_type,
            initiated_at: plan.initiated_at,
            expired_at: plan.expired_at,
            active: true,
            payment_id: plan.payment_id,
        };
        self.work.plans.push(row.clone());
        Ok(row)
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStoreTx {
    async fn find_subscription_by_id(&mut self, id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        Ok(self.work.subscriptions.iter().find(|s| s.id == id).cloned())
    }

    async fn find_subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        Ok(self
            .work
            .subscriptions
            .iter()
            .find(|s| s.provider_subscription_id.as_deref() == Some(provider_subscription_id))
            .cloned())
    }

    async fn find_active_subscription(
        &mut self,
        robot_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<Option<SubscriptionRow>> {
        Ok(self
            .work
            .subscriptions
            .iter()
            .filter(|s| {
                s.robot_id == robot_id
                    && s.status == "active"
                    && s.current_period_start <= now
                    && now < s.current_period_end
            })
            .max_by_key(|s| s.current_period_end)
            .cloned())
    }

    async fn find_expiring_subscriptions(
        &mut self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<SubscriptionRow>> {
        let mut subs: Vec<SubscriptionRow> = self
            .work
            .subscriptions
            .iter()
            .filter(|s| {
                s.status == "active" && s.current_period_end >= from && s.current_period_end < until
            })
            .cloned()
            .collect();
        subs.sort_by_key(|s| s.current_period_end);
        Ok(subs)
    }

    async fn create_subscription(&mut self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        if let Some(provider_id) = sub.provider_subscription_id.as_deref() {
            if self
                .work
                .subscriptions
                .iter()
                .any(|s| s.provider_subscription_id.as_deref() == Some(provider_id))
            {
                return Err(DbError::UniqueViolation(
                    "subscriptions_provider_id_key".to_string(),
                ));
            }
        }
        let now = Utc::now();
        let row = SubscriptionRow {
            id: sub.id,
            user_id: sub.user_id,
            robot_id: sub.robot_id,
            plan_type: sub.plan_type,
            status: sub.status,
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            provider_subscription_id: sub.provider_subscription_id,
            provider_customer_id: sub.provider_customer_id,
            cancel_at_period_end: false,
            canceled_at: None,
            created_at: now,
            updated_at: now,
        };
        self.work.subscriptions.push(row.clone());
        Ok(row)
    }

    async fn update_subscription_state(
        &mut self,
        id: Uuid,
        update: SubscriptionStateUpdate,
    ) -> DbResult<()> {
        if let Some(sub) = self.work.subscriptions.iter_mut().find(|s| s.id == id) {
            sub.status = update.status;
            sub.current_period_start = update.current_period_start;
            sub.current_period_end = update.current_period_end;
            sub.cancel_at_period_end = update.cancel_at_period_end;
            sub.canceled_at = update.canceled_at;
            sub.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_cancel_at_period_end(&mut self, id: Uuid, cancel: bool) -> DbResult<()> {
        if let Some(sub) = self.work.subscriptions.iter_mut().find(|s| s.id == id) {
            sub.cancel_at_period_end = cancel;
            sub.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn cancel_subscription(&mut self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        if let Some(sub) = self.work.subscriptions.iter_mut().find(|s| s.id == id) {
            sub.status = "canceled".to_string();
            sub.canceled_at = Some(at);
            sub.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRepository for MemoryStoreTx {
    async fn find_payment_by_id(&mut self, id: Uuid) -> DbResult<Option<PaymentRow>> {
        Ok(self.work.payments.iter().find(|p| p.id == id).cloned())
    }

    async fn lock_payment(&mut self, id: Uuid) -> DbResult<Option<PaymentRow>> {
        self.find_payment_by_id(id).await
    }

    async fn lock_payment_by_session(
        &mut self,
        session_id: &str,
    ) -> DbResult<Option<PaymentRow>> {
        Ok(self
            .work
            .payments
            .iter()
            .find(|p| p.provider_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn create_payment(&mut self, payment: CreatePayment) -> DbResult<PaymentRow> {
        if self.work.payments.iter().any(|p| {
            p.provider == payment.provider
                && p.provider_session_id.as_deref() == Some(payment.provider_session_id.as_str())
        }) {
            return Err(DbError::UniqueViolation(
                "payments_provider_session_key".to_string(),
            ));
        }
        let now = Utc::now();
        let row = PaymentRow {
            id: payment.id,
            user_id: payment.user_id,
            robot_id: None,
            plan_id: None,
            amount: payment.amount,
            currency: payment.currency,
            status: "pending".to_string(),
            provider: payment.provider,
            provider_payment_id: None,
            provider_customer_id: None,
            provider_session_id: Some(payment.provider_session_id),
            provider_subscription_id: None,
            metadata: Some(payment.metadata),
            created_at: now,
            updated_at: now,
        };
        self.work.payments.push(row.clone());
        Ok(row)
    }

    async fn complete_payment(&mut self, id: Uuid, completion: PaymentCompletion) -> DbResult<()> {
        if let Some(payment) = self.work.payments.iter_mut().find(|p| p.id == id) {
            payment.status = "completed".to_string();
            if completion.provider_customer_id.is_some() {
                payment.provider_customer_id = completion.provider_customer_id;
            }
            if completion.provider_subscription_id.is_some() {
                payment.provider_subscription_id = completion.provider_subscription_id;
            }
            if completion.provider_payment_id.is_some() {
                payment.provider_payment_id = completion.provider_payment_id;
            }
            payment.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_payment_status(&mut self, id: Uuid, status: &str) -> DbResult<()> {
        if let Some(payment) = self.work.payments.iter_mut().find(|p| p.id == id) {
            payment.status = status.to_string();
            payment.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn link_payment_robot(
        &mut self,
        id: Uuid,
        robot_id: Uuid,
        plan_id: Option<Uuid>,
    ) -> DbResult<()> {
        if let Some(payment) = self.work.payments.iter_mut().find(|p| p.id == id) {
            payment.robot_id = Some(robot_id);
            if plan_id.is_some() {
                payment.plan_id = plan_id;
            }
            payment.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationLogRepository for MemoryStoreTx {
    async fn append_conversation_log(
        &mut self,
        log: CreateConversationLog,
    ) -> DbResult<ConversationLogRow> {
        let row = ConversationLogRow {
            id: log.id,
            robot_id: log.robot_id,
            question: log.question,
            answer: log.answer,
            mood: log.mood,
            cost: log.cost,
            created_at: Utc::now(),
        };
        self.work.conversation_logs.push(row.clone());
        Ok(row)
    }

    async fn count_conversation_logs(&mut self, robot_id: Uuid) -> DbResult<i64> {
        let count = self
            .work
            .conversation_logs
            .iter()
            .filter(|l| l.robot_id == robot_id)
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl WebhookEventRepository for MemoryStoreTx {
    async fn record_webhook_event(&mut self, event_id: &str, event_type: &str) -> DbResult<bool> {
        if self.work.webhook_events.iter().any(|(id, _)| id == event_id) {
            return Ok(false);
        }
        self.work
            .webhook_events
            .push((event_id.to_string(), event_type.to_string()));
        Ok(true)
    }
}
