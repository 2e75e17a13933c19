//! Chat Repository Implementation
//!
//! PostgreSQL implementation of the ChatRepository trait. Membership lives
//! in `users_chats`; every read is scoped to a member.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::{Chat, ChatPage, ChatRepository, ChatSummary, Message, MessageStatus, Pagination};
use crate::shared::error::AppError;

/// PostgreSQL chat repository implementation.
#[derive(Clone)]
pub struct PgChatRepository {
    pool: PgPool,
}

impl PgChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChatRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ChatRow {
    fn into_chat(self) -> Chat {
        Chat {
            id: self.id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Chat listing row: the chat, its latest message (if any) and counters.
#[derive(Debug, sqlx::FromRow)]
struct ChatSummaryRow {
    id: i64,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_message_id: Option<i64>,
    last_message_key: Option<String>,
    last_message_user_id: Option<i64>,
    last_message_content: Option<String>,
    last_message_status: Option<String>,
    last_message_created_at: Option<DateTime<Utc>>,
    last_message_updated_at: Option<DateTime<Utc>>,
    last_message_username: Option<String>,
    unread_count: i64,
    participant_count: i64,
}

impl ChatSummaryRow {
    fn into_summary(self) -> ChatSummary {
        let last_message = match (
            self.last_message_id,
            self.last_message_user_id,
            self.last_message_created_at,
        ) {
            (Some(id), Some(user_id), Some(created_at)) => Some(Message {
                id,
                idempotency_key: self.last_message_key.unwrap_or_default(),
                user_id,
                chat_id: self.id,
                content: self.last_message_content.unwrap_or_default(),
                status: self
                    .last_message_status
                    .as_deref()
                    .and_then(MessageStatus::parse)
                    .unwrap_or_default(),
                created_at,
                updated_at: self.last_message_updated_at.unwrap_or(created_at),
                sender_username: self.last_message_username,
            }),
            _ => None,
        };

        ChatSummary {
            chat: Chat {
                id: self.id,
                name: self.name,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            last_message,
            unread_count: self.unread_count,
            participant_count: self.participant_count,
        }
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    /// Insert the chat and its members in one transaction.
    async fn create_with_members(&self, chat: &Chat, member_ids: &[i64]) -> Result<Chat, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            INSERT INTO chats (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(chat.id)
        .bind(&chat.name)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        for user_id in member_ids {
            sqlx::query(
                r#"
                INSERT INTO users_chats (user_id, chat_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, chat_id) DO NOTHING
                "#,
            )
            .bind(*user_id)
            .bind(chat.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(row.into_chat())
    }

    async fn find_for_member(&self, chat_id: i64, user_id: i64) -> Result<Option<Chat>, AppError> {
        let row = sqlx::query_as::<_, ChatRow>(
            r#"
            SELECT c.id, c.name, c.created_at, c.updated_at
            FROM chats c
            INNER JOIN users_chats uc ON c.id = uc.chat_id
            WHERE c.id = $1 AND uc.user_id = $2
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_chat()))
    }

    /// List chats with their latest message, newest chats first.
    ///
    /// The page and the total count run concurrently.
    async fn list_for_member(&self, user_id: i64, page: Pagination) -> Result<ChatPage, AppError> {
        let rows_query = sqlx::query_as::<_, ChatSummaryRow>(
            r#"
            SELECT c.id, c.name, c.created_at, c.updated_at,
                   lm.id AS last_message_id,
                   lm.idempotency_key AS last_message_key,
                   lm.user_id AS last_message_user_id,
                   lm.content AS last_message_content,
                   lm.status AS last_message_status,
                   lm.created_at AS last_message_created_at,
                   lm.updated_at AS last_message_updated_at,
                   lm.username AS last_message_username,
                   (SELECT COUNT(*) FROM messages m2
                     WHERE m2.chat_id = c.id AND m2.status <> 'READ' AND m2.user_id <> $1) AS unread_count,
                   (SELECT COUNT(DISTINCT uc2.user_id) FROM users_chats uc2
                     WHERE uc2.chat_id = c.id) AS participant_count
            FROM chats c
            INNER JOIN users_chats uc ON c.id = uc.chat_id
            LEFT JOIN LATERAL (
                SELECT m.id, m.idempotency_key, m.user_id, m.content, m.status,
                       m.created_at, m.updated_at, u.username
                FROM messages m
                INNER JOIN users u ON m.user_id = u.id
                WHERE m.chat_id = c.id
                ORDER BY m.created_at DESC, m.id DESC
                LIMIT 1
            ) lm ON TRUE
            WHERE uc.user_id = $1
            ORDER BY c.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool);

        let count_query = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(DISTINCT c.id)
            FROM chats c
            INNER JOIN users_chats uc ON c.id = uc.chat_id
            WHERE uc.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool);

        let (rows, total) = tokio::try_join!(rows_query, count_query)?;

        Ok(ChatPage {
            chats: rows.into_iter().map(|r| r.into_summary()).collect(),
            total,
        })
    }

    async fn is_member(&self, chat_id: i64, user_id: i64) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users_chats WHERE chat_id = $1 AND user_id = $2)",
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
