//! Message Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::application::dto::request::{
    MessageQueryParams, SendMessageRequest, UpdateMessageStatusRequest,
};
use crate::application::dto::response::{
    MessageListResponse, MessageResponse, MessageStatusResponse,
};
use crate::application::services::{
    MessageError, MessageQueryDto, MessageService, MessageServiceImpl,
};
use crate::domain::MessageStatus;
use crate::infrastructure::metrics;
use crate::infrastructure::repositories::{PgChatRepository, PgMessageRepository};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::{parse_id, validation_error};
use crate::startup::AppState;

fn message_service(state: &AppState) -> MessageServiceImpl<PgMessageRepository, PgChatRepository> {
    MessageServiceImpl::new(
        Arc::new(PgMessageRepository::new(state.db.clone())),
        Arc::new(PgChatRepository::new(state.db.clone())),
        state.idempotency.clone(),
        state.dispatcher.clone(),
        state.snowflake.clone(),
    )
    .with_status_broadcasts(state.settings.realtime.broadcast_status_updates)
}

/// Send a message to a chat
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let chat_id = parse_id(&chat_id, "chat id")?;
    body.validate().map_err(validation_error)?;

    let result = message_service(&state)
        .send_message(
            auth.user_id,
            chat_id,
            &body.content,
            body.idempotency_key.as_deref(),
        )
        .await;

    match result {
        Ok(message) => {
            metrics::record_message_sent();
            Ok((StatusCode::CREATED, Json(MessageResponse::from(message))))
        }
        Err(MessageError::Duplicate) => {
            metrics::record_duplicate_submission();
            Err(MessageError::Duplicate.into())
        }
        Err(e) => Err(e.into()),
    }
}

/// List a chat's messages, newest first
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(chat_id): Path<String>,
    Query(params): Query<MessageQueryParams>,
) -> Result<Json<MessageListResponse>, AppError> {
    let chat_id = parse_id(&chat_id, "chat id")?;

    let query = MessageQueryDto {
        chat_id,
        page: params.page,
        limit: params.limit,
        before: params.before,
        after: params.after,
    };

    let page = message_service(&state)
        .list_messages(auth.user_id, query)
        .await?;

    Ok(Json(MessageListResponse::from(page)))
}

/// Mark a message READ or DELIVERED
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(message_id): Path<String>,
    Json(body): Json<UpdateMessageStatusRequest>,
) -> Result<Json<MessageStatusResponse>, AppError> {
    let message_id = parse_id(&message_id, "message id")?;
    body.validate().map_err(validation_error)?;

    let status = MessageStatus::parse(&body.status)
        .ok_or_else(|| AppError::Validation(format!("Unknown status: {}", body.status)))?;

    let updated = message_service(&state)
        .update_status(auth.user_id, message_id, status)
        .await?;

    Ok(Json(MessageStatusResponse::from(updated)))
}
