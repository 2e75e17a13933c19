//! Chat Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{CreateChatRequest, PaginationParams};
use crate::application::dto::response::{ChatListResponse, ChatResponse, CreateChatResponse};
use crate::application::services::{ChatService, ChatServiceImpl};
use crate::infrastructure::repositories::{PgChatRepository, PgUserRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validation_error};
use crate::startup::AppState;

pub(crate) fn chat_service(state: &AppState) -> ChatServiceImpl<PgChatRepository, PgUserRepository> {
    ChatServiceImpl::new(
        Arc::new(PgChatRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.snowflake.clone(),
    )
}

/// Start a chat with another user
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<CreateChatResponse>), AppError> {
    body.validate().map_err(validation_error)?;

    let chat = chat_service(&state)
        .create_chat(auth.user_id, &body.name, &body.email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateChatResponse {
            chat_id: chat.id.to_string(),
        }),
    ))
}

/// List the caller's chats
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ChatListResponse>, AppError> {
    let page = chat_service(&state)
        .list_chats(auth.user_id, params.page, params.limit)
        .await?;

    Ok(Json(ChatListResponse::from(page)))
}

/// Get one chat the caller belongs to
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
) -> Result<Json<ChatResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat id")?;

    let chat = chat_service(&state).get_chat(chat_id, auth.user_id).await?;

    Ok(Json(ChatResponse::from(chat)))
}
