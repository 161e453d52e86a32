//! PostgreSQL conversation log repository implementation

use async_trait::async_trait;
use uuid::Uuid;

use super::PgStoreTx;
use crate::error::DbResult;
use crate::models::ConversationLogRow;
use crate::repo::{ConversationLogRepository, CreateConversationLog};

#[async_trait]
impl ConversationLogRepository for PgStoreTx {
    async fn append_conversation_log(
        &mut self,
        log: CreateConversationLog,
    ) -> DbResult<ConversationLogRow> {
        let row = sqlx::query_as::<_, ConversationLogRow>(
            r#"
            INSERT INTO conversation_logs (id, robot_id, question, answer, mood, cost)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, robot_id, question, answer, mood, cost, created_at
            "#,
        )
        .bind(log.id)
        .bind(log.robot_id)
        .bind(&log.question)
        .bind(&log.answer)
        .bind(&log.mood)
        .bind(log.cost)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row)
    }

    async fn count_conversation_logs(&mut self, robot_id: Uuid) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversation_logs WHERE robot_id = $1")
                .bind(robot_id)
                .fetch_one(&mut *self.tx)
                .await?;

        Ok(count)
    }
}
