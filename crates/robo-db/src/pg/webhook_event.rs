//! PostgreSQL processed-event ledger

use async_trait::async_trait;

use super::PgStoreTx;
use crate::error::DbResult;
use crate::repo::WebhookEventRepository;

#[async_trait]
impl WebhookEventRepository for PgStoreTx {
    async fn record_webhook_event(&mut self, event_id: &str, event_type: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
