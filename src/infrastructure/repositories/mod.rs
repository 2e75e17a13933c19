//! Repository Implementations
//!
//! PostgreSQL implementations of the repository traits defined in the
//! domain layer.
//!
//! ## Available Repositories
//!
//! - **PgUserRepository** - User accounts
//! - **PgChatRepository** - Chats and `users_chats` membership
//! - **PgMessageRepository** - Messages with member-scoped listing
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use crate::infrastructure::repositories::{PgChatRepository, PgMessageRepository, PgUserRepository};
//!
//! fn setup_repositories(pool: PgPool) {
//!     let user_repo = PgUserRepository::new(pool.clone());
//!     let chat_repo = PgChatRepository::new(pool.clone());
//!     let message_repo = PgMessageRepository::new(pool);
//! }
//! ```

pub mod chat_repository;
pub mod message_repository;
pub mod user_repository;

pub use chat_repository::PgChatRepository;
pub use message_repository::PgMessageRepository;
pub use user_repository::PgUserRepository;
