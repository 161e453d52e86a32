//! PostgreSQL payment repository implementation

use async_trait::async_trait;
use uuid::Uuid;

use super::PgStoreTx;
use crate::error::{DbError, DbResult};
use crate::models::PaymentRow;
use crate::repo::{CreatePayment, PaymentCompletion, PaymentRepository};

#[async_trait]
impl PaymentRepository for PgStoreTx {
    async fn find_payment_by_id(&mut self, id: Uuid) -> DbResult<Option<PaymentRow>> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, user_id, robot_id, plan_id, amount, currency, status, provider,
                   provider_payment_id, provider_customer_id, provider_session_id,
                   provider_subscription_id, metadata, created_at, updated_at
            FROM payments
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(payment)
    }

    async fn lock_payment(&mut self, id: Uuid) -> DbResult<Option<PaymentRow>> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, user_id, robot_id, plan_id, amount, currency, status, provider,
                   provider_payment_id, provider_customer_id, provider_session_id,
                   provider_subscription_id, metadata, created_at, updated_at
            FROM payments
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(payment)
    }

    async fn lock_payment_by_session(
        &mut self,
        session_id: &str,
    ) -> DbResult<Option<PaymentRow>> {
        let payment = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, user_id, robot_id, plan_id, amount, currency, status, provider,
                   provider_payment_id, provider_customer_id, provider_session_id,
                   provider_subscription_id, metadata, created_at, updated_at
            FROM payments
            WHERE provider_session_id = $1
            FOR UPDATE
            "#,
        )
        .bind(session_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(payment)
    }

    async fn create_payment(&mut self, payment: CreatePayment) -> DbResult<PaymentRow> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (id, user_id, amount, currency, status, provider,
                                  provider_session_id, metadata)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6, $7)
            RETURNING id, user_id, robot_id, plan_id, amount, currency, status, provider,
                      provider_payment_id, provider_customer_id, provider_session_id,
                      provider_subscription_id, metadata, created_at, updated_at
            "#,
        )
        .bind(payment.id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.provider)
        .bind(&payment.provider_session_id)
        .bind(&payment.metadata)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DbError::from_insert)?;

        Ok(row)
    }

    async fn complete_payment(&mut self, id: Uuid, completion: PaymentCompletion) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'completed',
                provider_customer_id = COALESCE($1, provider_customer_id),
                provider_subscription_id = COALESCE($2, provider_subscription_id),
                provider_payment_id = COALESCE($3, provider_payment_id),
                updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(&completion.provider_customer_id)
        .bind(&completion.provider_subscription_id)
        .bind(&completion.provider_payment_id)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn set_payment_status(&mut self, id: Uuid, status: &str) -> DbResult<()> {
        sqlx::query("UPDATE payments SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn link_payment_robot(
        &mut self,
        id: Uuid,
        robot_id: Uuid,
        plan_id: Option<Uuid>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE payments
            SET robot_id = $1, plan_id = COALESCE($2, plan_id), updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(robot_id)
        .bind(plan_id)
        .bind(id)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }
}
