//! PostgreSQL robot repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStoreTx;
use crate::error::{DbError, DbResult};
use crate::models::RobotRow;
use crate::repo::{CreateRobot, RobotRepository};

#[async_trait]
impl RobotRepository for PgStoreTx {
    async fn find_robot_by_id(&mut self, id: Uuid) -> DbResult<Option<RobotRow>> {
        let robot = sqlx::query_as::<_, RobotRow>(
            r#"
            SELECT id, name, user_id, status, activated_at, plan_valid_until, last_ping, created_at
            FROM robots
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(robot)
    }

    async fn find_robot_by_name(&mut self, name: &str) -> DbResult<Option<RobotRow>> {
        let robot = sqlx::query_as::<_, RobotRow>(
            r#"
            SELECT id, name, user_id, status, activated_at, plan_valid_until, last_ping, created_at
            FROM robots
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(robot)
    }

    async fn find_robot_by_owner_and_id(
        &mut self,
        id: Uuid,
        owner_id: Uuid,
    ) -> DbResult<Option<RobotRow>> {
        let robot = sqlx::query_as::<_, RobotRow>(
            r#"
            SELECT id, name, user_id, status, activated_at, plan_valid_until, last_ping, created_at
            FROM robots
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(robot)
    }

    async fn list_robots_by_owner(&mut self, owner_id: Uuid) -> DbResult<Vec<RobotRow>> {
        let robots = sqlx::query_as::<_, RobotRow>(
            r#"
            SELECT id, name, user_id, status, activated_at, plan_valid_until, last_ping, created_at
            FROM robots
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(robots)
    }

    async fn lock_robot(&mut self, id: Uuid) -> DbResult<Option<RobotRow>> {
        let robot = sqlx::query_as::<_, RobotRow>(
            r#"
            SELECT id, name, user_id, status, activated_at, plan_valid_until, last_ping, created_at
            FROM robots
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(robot)
    }

    async fn create_robot(&mut self, robot: CreateRobot) -> DbResult<RobotRow> {
        let row = sqlx::query_as::<_, RobotRow>(
            r#"
            INSERT INTO robots (id, name, user_id, status, activated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, user_id, status, activated_at, plan_valid_until, last_ping, created_at
            "#,
        )
        .bind(robot.id)
        .bind(&robot.name)
        .bind(robot.user_id)
        .bind(&robot.status)
        .bind(robot.activated_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DbError::from_insert)?;

        Ok(row)
    }

    async fn set_robot_status(&mut self, id: Uuid, status: &str) -> DbResult<()> {
        sqlx::query("UPDATE robots SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn set_plan_valid_until(
        &mut self,
        id: Uuid,
        valid_until: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        sqlx::query("UPDATE robots SET plan_valid_until = $1 WHERE id = $2")
            .bind(valid_until)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn touch_last_ping(&mut self, id: Uuid, at: DateTime<Utc>) -> DbResult<()> {
        sqlx::query("UPDATE robots SET last_ping = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }
}
