//! PostgreSQL plan repository implementation

use async_trait::async_trait;
use uuid::Uuid;

use super::PgStoreTx;
use crate::error::{DbError, DbResult};
use crate::models::PlanRow;
use crate::repo::{CreatePlan, PlanRepository};

#[async_trait]
impl PlanRepository for PgStoreTx {
    async fn find_active_plan(&mut self, robot_id: Uuid) -> DbResult<Option<PlanRow>> {
        let plan = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, user_id, robot_id, plan_type, initiated_at, expired_at, active, payment_id
            FROM plans
            WHERE robot_id = $1 AND active
            ORDER BY expired_at DESC
            LIMIT 1
            "#,
        )
        .bind(robot_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(plan)
    }

    async fn list_plans_by_robot(&mut self, robot_id: Uuid) -> DbResult<Vec<PlanRow>> {
        let plans = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, user_id, robot_id, plan_type, initiated_at, expired_at, active, payment_id
            FROM plans
            WHERE robot_id = $1
            ORDER BY initiated_at DESC
            "#,
        )
        .bind(robot_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(plans)
    }

    async fn deactivate_plans(&mut self, robot_id: Uuid) -> DbResult<u64> {
        let result = sqlx::query("UPDATE plans SET active = FALSE WHERE robot_id = $1 AND active")
            .bind(robot_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    async fn create_plan(&mut self, plan: CreatePlan) -> DbResult<PlanRow> {
        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            INSERT INTO plans (id, user_id, robot_id, plan_type, initiated_at, expired_at, payment_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, robot_id, plan_type, initiated_at, expired_at, active, payment_id
            "#,
        )
        .bind(plan.id)
        .bind(plan.user_id)
        .bind(plan.robot_id)
        .bind(&plan.plan_type)
        .bind(plan.initiated_at)
        .bind(plan.expired_at)
        .bind(&plan.payment_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DbError::from_insert)?;

        Ok(row)
    }
}
