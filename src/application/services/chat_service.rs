//! Chat Service
//!
//! Creates conversations and lists them for their members.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{Chat, ChatPage, ChatRepository, Pagination, UserRepository};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Default page size for chat listings.
pub const DEFAULT_CHAT_PAGE_SIZE: i64 = 20;

/// Chat service trait
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Create a chat between `user_id` and the user registered under `counterpart_email`
    async fn create_chat(&self, user_id: i64, name: &str, counterpart_email: &str) -> Result<Chat, ChatError>;

    /// Get a chat the user belongs to
    async fn get_chat(&self, chat_id: i64, user_id: i64) -> Result<Chat, ChatError>;

    /// List the user's chats, newest first
    async fn list_chats(&self, user_id: i64, page: Option<i64>, limit: Option<i64>) -> Result<ChatPage, ChatError>;
}

/// Chat service errors
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat not found")]
    NotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Cannot start a chat with yourself")]
    SelfChat,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ChatError> for AppError {
    fn from(e: ChatError) -> Self {
        match e {
            ChatError::NotFound | ChatError::UserNotFound => AppError::NotFound(e.to_string()),
            ChatError::SelfChat => AppError::Validation(e.to_string()),
            ChatError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// ChatService implementation
pub struct ChatServiceImpl<C, U>
where
    C: ChatRepository,
    U: UserRepository,
{
    chat_repo: Arc<C>,
    user_repo: Arc<U>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<C, U> ChatServiceImpl<C, U>
where
    C: ChatRepository,
    U: UserRepository,
{
    pub fn new(chat_repo: Arc<C>, user_repo: Arc<U>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self {
            chat_repo,
            user_repo,
            id_generator,
        }
    }
}

#[async_trait]
impl<C, U> ChatService for ChatServiceImpl<C, U>
where
    C: ChatRepository + 'static,
    U: UserRepository + 'static,
{
    async fn create_chat(&self, user_id: i64, name: &str, counterpart_email: &str) -> Result<Chat, ChatError> {
        let counterpart = self
            .user_repo
            .find_by_email(&counterpart_email.trim().to_lowercase())
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or(ChatError::UserNotFound)?;

        if counterpart.id == user_id {
            return Err(ChatError::SelfChat);
        }

        let now = Utc::now();
        let chat = Chat {
            id: self.id_generator.generate(),
            name: name.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        let created = self
            .chat_repo
            .create_with_members(&chat, &[user_id, counterpart.id])
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        tracing::info!(chat_id = created.id, user_id, counterpart_id = counterpart.id, "Chat created");
        Ok(created)
    }

    async fn get_chat(&self, chat_id: i64, user_id: i64) -> Result<Chat, ChatError> {
        self.chat_repo
            .find_for_member(chat_id, user_id)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))?
            .ok_or(ChatError::NotFound)
    }

    async fn list_chats(&self, user_id: i64, page: Option<i64>, limit: Option<i64>) -> Result<ChatPage, ChatError> {
        let page = Pagination::normalize(page, limit, DEFAULT_CHAT_PAGE_SIZE);

        self.chat_repo
            .list_for_member(user_id, page)
            .await
            .map_err(|e| ChatError::Internal(e.to_string()))
    }
}
