//! Response DTOs
//!
//! Data structures for API response bodies. IDs are serialized as strings.

use serde::Serialize;

use crate::application::services::{MessageDto, MessageListDto, MessageStatusDto};
use crate::domain::{Chat, ChatPage, ChatSummary, Message, User};

/// Public user profile
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Registration / login response
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub user: UserResponse,
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    pub fn new(user: &User, token: String, expires_in: i64) -> Self {
        Self {
            user_id: user.id.to_string(),
            user: UserResponse::from(user),
            token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// Refreshed token
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Chat created
#[derive(Debug, Serialize)]
pub struct CreateChatResponse {
    pub chat_id: String,
}

/// Chat response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        Self {
            id: chat.id.to_string(),
            name: chat.name,
            created_at: chat.created_at.to_rfc3339(),
            updated_at: chat.updated_at.to_rfc3339(),
        }
    }
}

/// Chat as listed for the caller
#[derive(Debug, Serialize)]
pub struct ChatSummaryResponse {
    #[serde(flatten)]
    pub chat: ChatResponse,
    pub last_message: Option<MessageResponse>,
    pub unread_count: i64,
    pub participant_count: i64,
}

impl From<ChatSummary> for ChatSummaryResponse {
    fn from(summary: ChatSummary) -> Self {
        Self {
            chat: ChatResponse::from(summary.chat),
            last_message: summary.last_message.map(MessageResponse::from),
            unread_count: summary.unread_count,
            participant_count: summary.participant_count,
        }
    }
}

/// Page of chats
#[derive(Debug, Serialize)]
pub struct ChatListResponse {
    pub chats: Vec<ChatSummaryResponse>,
    pub total: i64,
}

impl From<ChatPage> for ChatListResponse {
    fn from(page: ChatPage) -> Self {
        Self {
            chats: page.chats.into_iter().map(ChatSummaryResponse::from).collect(),
            total: page.total,
        }
    }
}

/// Message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub content: String,
    pub status: String,
    pub created_at: String,
}

impl From<MessageDto> for MessageResponse {
    fn from(dto: MessageDto) -> Self {
        Self {
            id: dto.id.to_string(),
            chat_id: dto.chat_id.to_string(),
            user_id: dto.user_id.to_string(),
            username: dto.username,
            content: dto.content,
            status: dto.status.as_str().to_string(),
            created_at: dto.created_at.to_rfc3339(),
        }
    }
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        MessageDto::from(message).into()
    }
}

/// Page of messages
#[derive(Debug, Serialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessageResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

impl From<MessageListDto> for MessageListResponse {
    fn from(dto: MessageListDto) -> Self {
        Self {
            messages: dto.messages.into_iter().map(MessageResponse::from).collect(),
            total: dto.total,
            page: dto.page,
            limit: dto.limit,
        }
    }
}

/// Status update confirmation
#[derive(Debug, Serialize)]
pub struct MessageStatusResponse {
    pub message_id: String,
    pub status: String,
}

impl From<MessageStatusDto> for MessageStatusResponse {
    fn from(dto: MessageStatusDto) -> Self {
        Self {
            message_id: dto.message_id.to_string(),
            status: dto.status.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageStatus;
    use chrono::Utc;

    #[test]
    fn test_chat_summary_flattens_chat() {
        let now = Utc::now();
        let summary = ChatSummary {
            chat: Chat {
                id: 5,
                name: "Lunch".into(),
                created_at: now,
                updated_at: now,
            },
            last_message: None,
            unread_count: 2,
            participant_count: 2,
        };

        let json = serde_json::to_value(ChatSummaryResponse::from(summary)).unwrap();

        assert_eq!(json["id"], "5");
        assert_eq!(json["name"], "Lunch");
        assert_eq!(json["unread_count"], 2);
        assert!(json["last_message"].is_null());
    }

    #[test]
    fn test_message_ids_are_strings() {
        let response = MessageResponse::from(MessageDto {
            id: 9_007_199_254_740_993,
            chat_id: 1,
            user_id: 2,
            username: Some("alice".into()),
            content: "hi".into(),
            status: MessageStatus::Sent,
            created_at: Utc::now(),
        });

        let json = serde_json::to_value(response).unwrap();
        assert_eq!(json["id"], "9007199254740993");
        assert_eq!(json["status"], "SENT");
    }

    #[test]
    fn test_auth_response_carries_profile_without_hash() {
        let now = Utc::now();
        let user = User {
            id: 42,
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(AuthResponse::new(&user, "tok".into(), 3600)).unwrap();

        assert_eq!(json["user_id"], "42");
        assert_eq!(json["user"]["id"], "42");
        assert_eq!(json["user"]["email"], "alice@example.com");
        assert_eq!(json["user"]["created_at"], now.to_rfc3339());
        assert!(json["user"].get("password_hash").is_none());
    }
}
