//! PostgreSQL user repository implementation

use async_trait::async_trait;
use uuid::Uuid;

use super::PgStoreTx;
use crate::error::{DbError, DbResult};
use crate::models::UserRow;
use crate::repo::{CreateUser, UserRepository};

#[async_trait]
impl UserRepository for PgStoreTx {
    async fn find_user_by_id(&mut self, id: Uuid) -> DbResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, messages_used, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> DbResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, messages_used, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn lock_user(&mut self, id: Uuid) -> DbResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, messages_used, created_at, updated_at
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(user)
    }

    async fn create_user(&mut self, user: CreateUser) -> DbResult<UserRow> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, messages_used, created_at, updated_at
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DbError::from_insert)?;

        Ok(row)
    }

    async fn increment_messages_used(&mut self, id: Uuid) -> DbResult<i64> {
        let used: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE users
            SET messages_used = messages_used + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING messages_used
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        used.ok_or(DbError::NotFound)
    }
}
