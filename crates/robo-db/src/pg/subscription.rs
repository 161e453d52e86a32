//! PostgreSQL subscription repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStoreTx;
use crate::error::{DbError, DbResult};
use crate::models::SubscriptionRow;
use crate::repo::{CreateSubscription, SubscriptionRepository, SubscriptionStateUpdate};

#[async_trait]
impl SubscriptionRepository for PgStoreTx {
    async fn find_subscription_by_id(&mut self, id: Uuid) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, robot_id, plan_type, status, current_period_start,
                   current_period_end, provider_subscription_id, provider_customer_id,
                   cancel_at_period_end, canceled_at, created_at, updated_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sub)
    }

    async fn find_subscription_by_provider_id(
        &mut self,
        provider_subscription_id: &str,
    ) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, robot_id, plan_type, status, current_period_start,
                   current_period_end, provider_subscription_id, provider_customer_id,
                   cancel_at_period_end, canceled_at, created_at, updated_at
            FROM subscriptions
            WHERE provider_subscription_id = $1
            FOR UPDATE
            "#,
        )
        .bind(provider_subscription_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sub)
    }

    async fn find_active_subscription(
        &mut self,
        robot_id: Uuid,
        now: DateTime<Utc>,
    ) -> DbResult<Option<SubscriptionRow>> {
        let sub = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, robot_id, plan_type, status, current_period_start,
                   current_period_end, provider_subscription_id, provider_customer_id,
                   cancel_at_period_end, canceled_at, created_at, updated_at
            FROM subscriptions
            WHERE robot_id = $1
              AND status = 'active'
              AND current_period_start <= $2
              AND current_period_end > $2
            ORDER BY current_period_end DESC
            LIMIT 1
            "#,
        )
        .bind(robot_id)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(sub)
    }

    async fn find_expiring_subscriptions(
        &mut self,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> DbResult<Vec<SubscriptionRow>> {
        let subs = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, robot_id, plan_type, status, current_period_start,
                   current_period_end, provider_subscription_id, provider_customer_id,
                   cancel_at_period_end, canceled_at, created_at, updated_at
            FROM subscriptions
            WHERE status = 'active'
              AND current_period_end >= $1
              AND current_period_end < $2
            ORDER BY current_period_end ASC
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(subs)
    }

    async fn create_subscription(&mut self, sub: CreateSubscription) -> DbResult<SubscriptionRow> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (id, user_id, robot_id, plan_type, status,
                                       current_period_start, current_period_end,
                                       provider_subscription_id, provider_customer_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, robot_id, plan_type, status, current_period_start,
                      current_period_end, provider_subscription_id, provider_customer_id,
                      cancel_at_period_end, canceled_at, created_at, updated_at
            "#,
        )
        .bind(sub.id)
        .bind(sub.user_id)
        .bind(sub.robot_id)
        .bind(&sub.plan_type)
        .bind(&sub.status)
        .bind(sub.current_period_start)
        .bind(sub.current_period_end)
        .bind(&sub.provider_subscription_id)
        .bind(&sub.provider_customer_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DbError::from_insert)?;

        Ok(row)
    }

    async fn update_subscription_state(
        &mut self,
        id: Uuid,
        update: SubscriptionStateUpdate,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = $1, current_period_start = $2, current_period_end = $3,
                cancel_at_period_end = $4, canceled_at = $5, updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&update.status)
        .bind(update.current_period_start)
        .bind(update.current_period_end)
        .bind(update.cancel_at_period_end)
        .bind(update.canceled_at)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn set_cancel_at_period_end(&mut self, id: Uuid, cancel: bool) -> DbResult<()> {
        sqlx::query(
            "UPDATE subscriptions SET cancel_at_period_end = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(cancel)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn cancel_subscription(&mut self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'canceled', canceled_at = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(at)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }
}
