//! Chat entity and repository trait.
//!
//! Maps to the `chats` and `users_chats` tables.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::Message;
use super::Pagination;
use crate::shared::error::AppError;

/// A conversation between two or more users.
///
/// Maps to the `chats` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - name: VARCHAR(100) NOT NULL
/// - created_at / updated_at: TIMESTAMPTZ
///
/// Membership lives in `users_chats (user_id, chat_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chat as listed for one member: the latest message plus counters.
#[derive(Debug, Clone)]
pub struct ChatSummary {
    pub chat: Chat,
    pub last_message: Option<Message>,
    /// Messages from other participants that are not READ yet
    pub unread_count: i64,
    pub participant_count: i64,
}

/// One page of a member's chats.
#[derive(Debug, Clone, Default)]
pub struct ChatPage {
    pub chats: Vec<ChatSummary>,
    pub total: i64,
}

/// Repository trait for Chat data access operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Create a chat and add every listed user as a member, atomically.
    async fn create_with_members(&self, chat: &Chat, member_ids: &[i64]) -> Result<Chat, AppError>;

    /// Find a chat visible to the given member.
    async fn find_for_member(&self, chat_id: i64, user_id: i64) -> Result<Option<Chat>, AppError>;

    /// List the chats a user belongs to, newest first.
    async fn list_for_member(&self, user_id: i64, page: Pagination) -> Result<ChatPage, AppError>;

    /// Check whether a user belongs to a chat.
    async fn is_member(&self, chat_id: i64, user_id: i64) -> Result<bool, AppError>;
}
