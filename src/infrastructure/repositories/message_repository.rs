//! Message Repository Implementation
//!
//! PostgreSQL implementation of message storage, member-scoped listing with
//! optional time bounds, and status transitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Message, MessagePage, MessageQuery, MessageRepository, MessageStatus};
use crate::shared::error::AppError;

/// PostgreSQL message repository implementation.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for message queries, joined with the author's username.
#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    idempotency_key: String,
    user_id: i64,
    chat_id: i64,
    content: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    username: Option<String>,
}

impl MessageRow {
    fn into_message(self) -> Message {
        Message {
            id: self.id,
            idempotency_key: self.idempotency_key,
            user_id: self.user_id,
            chat_id: self.chat_id,
            content: self.content,
            status: MessageStatus::parse(&self.status).unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            sender_username: self.username,
        }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn send(&self, message: &Message) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO messages (id, idempotency_key, user_id, chat_id, content, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(message.id)
        .bind(&message.idempotency_key)
        .bind(message.user_id)
        .bind(message.chat_id)
        .bind(&message.content)
        .bind(message.status.as_str())
        .bind(message.created_at)
        .bind(message.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Option<Message>, AppError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, m.idempotency_key, m.user_id, m.chat_id, m.content, m.status,
                   m.created_at, m.updated_at, u.username
            FROM messages m
            LEFT JOIN users u ON m.user_id = u.id
            WHERE m.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_message()))
    }

    /// Newest first. Both bounds are exclusive; the page and total run
    /// concurrently against the same filter.
    async fn list(&self, query: &MessageQuery) -> Result<MessagePage, AppError> {
        let rows_query = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT m.id, m.idempotency_key, m.user_id, m.chat_id, m.content, m.status,
                   m.created_at, m.updated_at, u.username
            FROM messages m
            INNER JOIN users_chats uc ON m.chat_id = uc.chat_id AND uc.user_id = $2
            LEFT JOIN users u ON m.user_id = u.id
            WHERE m.chat_id = $1
              AND ($3::timestamptz IS NULL OR m.created_at < $3)
              AND ($4::timestamptz IS NULL OR m.created_at > $4)
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(query.chat_id)
        .bind(query.user_id)
        .bind(query.before)
        .bind(query.after)
        .bind(query.page.limit)
        .bind(query.page.offset())
        .fetch_all(&self.pool);

        let count_query = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM messages m
            INNER JOIN users_chats uc ON m.chat_id = uc.chat_id AND uc.user_id = $2
            WHERE m.chat_id = $1
              AND ($3::timestamptz IS NULL OR m.created_at < $3)
              AND ($4::timestamptz IS NULL OR m.created_at > $4)
            "#,
        )
        .bind(query.chat_id)
        .bind(query.user_id)
        .bind(query.before)
        .bind(query.after)
        .fetch_one(&self.pool);

        let (rows, total) = tokio::try_join!(rows_query, count_query)?;

        Ok(MessagePage {
            messages: rows.into_iter().map(|r| r.into_message()).collect(),
            total,
        })
    }

    async fn mark_as_read(&self, message_id: i64, user_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = 'READ', updated_at = NOW()
            WHERE id = $1
              AND chat_id IN (SELECT chat_id FROM users_chats WHERE user_id = $2)
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_as_delivered(&self, message_id: i64) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE messages SET status = 'DELIVERED', updated_at = NOW() WHERE id = $1",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
