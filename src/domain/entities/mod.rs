//! # Domain Entities
//!
//! Core domain entities of the messaging backend and the repository traits
//! that the infrastructure layer implements.
//!
//! - **User**: account with credentials
//! - **Chat**: a conversation and its membership
//! - **Message**: a persisted chat message with delivery status

mod chat;
mod message;
mod user;

pub use chat::{Chat, ChatPage, ChatRepository, ChatSummary};
pub use message::{Message, MessagePage, MessageQuery, MessageRepository, MessageStatus};
pub use user::{User, UserRepository};

#[cfg(test)]
pub use chat::MockChatRepository;
#[cfg(test)]
pub use message::MockMessageRepository;
#[cfg(test)]
pub use user::MockUserRepository;

/// Largest page size any listing accepts.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Page-number pagination, normalized before it reaches a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// Clamp raw request values: pages start at 1, non-positive limits use
    /// `default_limit`, and limits are capped at [`MAX_PAGE_SIZE`].
    pub fn normalize(page: Option<i64>, limit: Option<i64>, default_limit: i64) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let limit = limit
            .filter(|l| *l >= 1)
            .unwrap_or(default_limit)
            .min(MAX_PAGE_SIZE);
        Self { page, limit }
    }

    /// Row offset for SQL `OFFSET`.
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}
