//! Application Services
//!
//! Business logic services that coordinate domain operations.
//!
//! ## Available Services
//!
//! - **AuthService**: Registration, login, JWT issuance and refresh
//! - **ChatService**: Chat creation and membership-scoped listing
//! - **MessageService**: Idempotent sends, listing, status updates
//! - **UserService**: User profile lookup

pub mod auth_service;
pub mod chat_service;
pub mod message_service;
pub mod user_service;

// Re-export auth service types
pub use auth_service::{AuthError, AuthService, AuthServiceImpl, Claims, TokenIssuer};

// Re-export chat service types
pub use chat_service::{ChatError, ChatService, ChatServiceImpl, DEFAULT_CHAT_PAGE_SIZE};

// Re-export message service types
pub use message_service::{
    derive_idempotency_key, MessageDto, MessageError, MessageListDto, MessageQueryDto, MessageService,
    MessageServiceImpl, MessageStatusDto, DEFAULT_MESSAGE_PAGE_SIZE, MAX_CONTENT_LENGTH,
};

// Re-export user service types
pub use user_service::{UserError, UserService, UserServiceImpl};
