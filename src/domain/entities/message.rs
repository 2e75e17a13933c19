//! Message entity and repository trait.
//!
//! Maps to the `messages` table in the database schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Pagination;
use crate::shared::error::AppError;

/// Delivery status of a persisted message.
///
/// Stored as VARCHAR with a CHECK constraint ('SENT', 'READ', 'DELIVERED').
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    #[default]
    Sent,
    Read,
    Delivered,
}

impl MessageStatus {
    /// Convert from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SENT" => Some(Self::Sent),
            "READ" => Some(Self::Read),
            "DELIVERED" => Some(Self::Delivered),
            _ => None,
        }
    }

    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Read => "READ",
            Self::Delivered => "DELIVERED",
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a message in a chat.
///
/// Maps to the `messages` table:
/// - id: BIGINT PRIMARY KEY (Snowflake ID)
/// - idempotency_key: VARCHAR(255) NOT NULL (indexed, not unique)
/// - user_id: BIGINT NOT NULL REFERENCES users(id)
/// - chat_id: BIGINT NOT NULL REFERENCES chats(id)
/// - content: TEXT NOT NULL
/// - status: VARCHAR(16) NOT NULL DEFAULT 'SENT'
/// - created_at / updated_at: TIMESTAMPTZ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub idempotency_key: String,
    pub user_id: i64,
    pub chat_id: i64,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Author's username, joined from `users` on reads
    pub sender_username: Option<String>,
}

/// Filter for listing a chat's messages on behalf of a member.
#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub chat_id: i64,
    pub user_id: i64,
    pub page: Pagination,
    /// Only messages created strictly before this instant
    pub before: Option<DateTime<Utc>>,
    /// Only messages created strictly after this instant
    pub after: Option<DateTime<Utc>>,
}

/// One page of messages plus the total matching the filter.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: i64,
}

/// Repository trait for Message data access operations.
///
/// Absent rows are reported as `None` / `false`, never as errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Persist a new message and return its ID.
    async fn send(&self, message: &Message) -> Result<i64, AppError>;

    /// Fetch the canonical stored record, including the sender's username.
    async fn get(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// List messages newest first with the total count for the same filter.
    async fn list(&self, query: &MessageQuery) -> Result<MessagePage, AppError>;

    /// Mark as READ if the message belongs to a chat the user is a member of.
    async fn mark_as_read(&self, message_id: i64, user_id: i64) -> Result<bool, AppError>;

    /// Mark as DELIVERED.
    async fn mark_as_delivered(&self, message_id: i64) -> Result<bool, AppError>;
}
