//! Message Service
//!
//! The idempotent send gate plus message listing and status updates.
//!
//! A send runs validation and the membership check first, then claims its
//! idempotency key, persists, and finally broadcasts to live subscribers.
//! Only the first submission of a key inside the TTL window gets past the
//! claim; broadcast problems never fail the send.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::application::realtime::{envelope_from_message, status_envelope, Dispatcher};
use crate::domain::{
    ChatRepository, Message, MessagePage, MessageQuery, MessageRepository, MessageStatus, Pagination,
};
use crate::infrastructure::cache::IdempotencyStore;
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Maximum message length in characters.
pub const MAX_CONTENT_LENGTH: usize = 4000;

/// Maximum length of a client-supplied idempotency key.
pub const MAX_IDEMPOTENCY_KEY_LENGTH: usize = 255;

/// Default page size for message listings.
pub const DEFAULT_MESSAGE_PAGE_SIZE: i64 = 50;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Send a message to a chat the user belongs to
    async fn send_message(
        &self,
        user_id: i64,
        chat_id: i64,
        content: &str,
        idempotency_key: Option<&str>,
    ) -> Result<MessageDto, MessageError>;

    /// List a chat's messages, newest first
    async fn list_messages(&self, user_id: i64, query: MessageQueryDto) -> Result<MessageListDto, MessageError>;

    /// Apply a READ or DELIVERED transition
    async fn update_status(
        &self,
        user_id: i64,
        message_id: i64,
        status: MessageStatus,
    ) -> Result<MessageStatusDto, MessageError>;
}

/// Message data transfer object
#[derive(Debug, Clone, PartialEq)]
pub struct MessageDto {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageDto {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            user_id: message.user_id,
            username: message.sender_username,
            content: message.content,
            status: message.status,
            created_at: message.created_at,
        }
    }
}

/// Message listing parameters
#[derive(Debug, Clone, Default)]
pub struct MessageQueryDto {
    pub chat_id: i64,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub before: Option<DateTime<Utc>>,
    pub after: Option<DateTime<Utc>>,
}

/// A page of messages
#[derive(Debug, Clone, Default)]
pub struct MessageListDto {
    pub messages: Vec<MessageDto>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Confirmation of a status update
#[derive(Debug, Clone, PartialEq)]
pub struct MessageStatusDto {
    pub message_id: i64,
    pub status: MessageStatus,
}

/// Message service errors
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("{0}")]
    Validation(String),

    #[error("Chat not found")]
    ChatNotFound,

    #[error("Message not found")]
    NotFound,

    #[error("Message already submitted")]
    Duplicate,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MessageError> for AppError {
    fn from(e: MessageError) -> Self {
        match e {
            MessageError::Validation(msg) => AppError::Validation(msg),
            MessageError::ChatNotFound | MessageError::NotFound => AppError::NotFound(e.to_string()),
            MessageError::Duplicate => AppError::DuplicateSubmission(e.to_string()),
            MessageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Idempotency key used when the client does not supply one.
///
/// Hex SHA-256 of `user_id:chat_id:content`, so retries of the same text are
/// collapsed inside the TTL window.
pub fn derive_idempotency_key(user_id: i64, chat_id: i64, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{user_id}:{chat_id}:{content}").as_bytes());
    format!("{:x}", hasher.finalize())
}

/// MessageService implementation
pub struct MessageServiceImpl<M, C>
where
    M: MessageRepository,
    C: ChatRepository,
{
    message_repo: Arc<M>,
    chat_repo: Arc<C>,
    idempotency: Arc<dyn IdempotencyStore>,
    dispatcher: Arc<Dispatcher>,
    id_generator: Arc<SnowflakeGenerator>,
    broadcast_status_updates: bool,
}

impl<M, C> MessageServiceImpl<M, C>
where
    M: MessageRepository,
    C: ChatRepository,
{
    pub fn new(
        message_repo: Arc<M>,
        chat_repo: Arc<C>,
        idempotency: Arc<dyn IdempotencyStore>,
        dispatcher: Arc<Dispatcher>,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            message_repo,
            chat_repo,
            idempotency,
            dispatcher,
            id_generator,
            broadcast_status_updates: false,
        }
    }

    /// Push READ/DELIVERED receipts to the chat's subscribers.
    pub fn with_status_broadcasts(mut self, enabled: bool) -> Self {
        self.broadcast_status_updates = enabled;
        self
    }

    async fn ensure_member(&self, chat_id: i64, user_id: i64) -> Result<(), MessageError> {
        let is_member = self
            .chat_repo
            .is_member(chat_id, user_id)
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))?;

        if !is_member {
            return Err(MessageError::ChatNotFound);
        }
        Ok(())
    }

    /// Load the canonical record after a write. Failures are logged only.
    async fn load_stored(&self, message_id: i64) -> Option<Message> {
        match self.message_repo.get(message_id).await {
            Ok(Some(stored)) => Some(stored),
            Ok(None) => {
                tracing::warn!(message_id, "Stored message vanished before broadcast");
                None
            }
            Err(e) => {
                tracing::warn!(message_id, error = %e, "Failed to load stored message");
                None
            }
        }
    }
}

fn validate_content(content: &str) -> Result<(), MessageError> {
    if content.trim().is_empty() {
        return Err(MessageError::Validation("content is required".into()));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(MessageError::Validation(format!(
            "content must be at most {MAX_CONTENT_LENGTH} characters"
        )));
    }
    Ok(())
}

fn resolve_key(
    user_id: i64,
    chat_id: i64,
    content: &str,
    supplied: Option<&str>,
) -> Result<String, MessageError> {
    match supplied.map(str::trim).filter(|k| !k.is_empty()) {
        Some(key) if key.len() > MAX_IDEMPOTENCY_KEY_LENGTH => Err(MessageError::Validation(format!(
            "idempotency_key must be at most {MAX_IDEMPOTENCY_KEY_LENGTH} bytes"
        ))),
        Some(key) => Ok(key.to_string()),
        None => Ok(derive_idempotency_key(user_id, chat_id, content)),
    }
}

#[async_trait]
impl<M, C> MessageService for MessageServiceImpl<M, C>
where
    M: MessageRepository + 'static,
    C: ChatRepository + 'static,
{
    #[tracing::instrument(skip(self, content, idempotency_key))]
    async fn send_message(
        &self,
        user_id: i64,
        chat_id: i64,
        content: &str,
        idempotency_key: Option<&str>,
    ) -> Result<MessageDto, MessageError> {
        validate_content(content)?;
        let key = resolve_key(user_id, chat_id, content, idempotency_key)?;
        self.ensure_member(chat_id, user_id).await?;

        let duplicate = self.idempotency.check_and_set(&key).await.map_err(|e| {
            tracing::error!(error = %e, "Idempotency store unavailable");
            MessageError::Internal(format!("idempotency check failed: {e}"))
        })?;
        if duplicate {
            tracing::info!(idempotency_key = %key, "Duplicate submission rejected");
            return Err(MessageError::Duplicate);
        }

        let now = Utc::now();
        let message = Message {
            id: self.id_generator.generate(),
            idempotency_key: key.clone(),
            user_id,
            chat_id,
            content: content.to_string(),
            status: MessageStatus::Sent,
            created_at: now,
            updated_at: now,
            sender_username: None,
        };

        let message_id = match self.message_repo.send(&message).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(error = %e, "Failed to persist message");
                if let Err(release_err) = self.idempotency.release(&key).await {
                    tracing::warn!(error = %release_err, "Failed to release idempotency key");
                }
                return Err(MessageError::Internal(e.to_string()));
            }
        };

        let Some(stored) = self.load_stored(message_id).await else {
            return Ok(MessageDto::from(Message { id: message_id, ..message }));
        };

        let outcome = self.dispatcher.broadcast(chat_id, envelope_from_message(&stored));
        tracing::info!(
            message_id,
            delivered = outcome.delivered,
            evicted = outcome.evicted,
            "Message broadcast to realtime subscribers"
        );

        Ok(MessageDto::from(stored))
    }

    async fn list_messages(&self, user_id: i64, query: MessageQueryDto) -> Result<MessageListDto, MessageError> {
        if let (Some(before), Some(after)) = (query.before, query.after) {
            if after >= before {
                return Err(MessageError::Validation("after must be earlier than before".into()));
            }
        }
        self.ensure_member(query.chat_id, user_id).await?;

        let page = Pagination::normalize(query.page, query.limit, DEFAULT_MESSAGE_PAGE_SIZE);
        let MessagePage { messages, total } = self
            .message_repo
            .list(&MessageQuery {
                chat_id: query.chat_id,
                user_id,
                page,
                before: query.before,
                after: query.after,
            })
            .await
            .map_err(|e| MessageError::Internal(e.to_string()))?;

        Ok(MessageListDto {
            messages: messages.into_iter().map(MessageDto::from).collect(),
            total,
            page: page.page,
            limit: page.limit,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn update_status(
        &self,
        user_id: i64,
        message_id: i64,
        status: MessageStatus,
    ) -> Result<MessageStatusDto, MessageError> {
        let updated = match status {
            MessageStatus::Read => self.message_repo.mark_as_read(message_id, user_id).await,
            MessageStatus::Delivered => self.message_repo.mark_as_delivered(message_id).await,
            MessageStatus::Sent => {
                return Err(MessageError::Validation(
                    "status must be READ or DELIVERED".into(),
                ))
            }
        }
        .map_err(|e| MessageError::Internal(e.to_string()))?;

        if !updated {
            return Err(MessageError::NotFound);
        }

        if self.broadcast_status_updates {
            if let Some(message) = self.load_stored(message_id).await {
                self.dispatcher.broadcast(message.chat_id, status_envelope(&message));
            }
        }

        Ok(MessageStatusDto { message_id, status })
    }
}
