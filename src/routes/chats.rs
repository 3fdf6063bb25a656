use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::dto::chat_dto::{ChatListResponse, ChatMessagesResponse, SendMessageRequest};
use crate::error::Result;
use crate::models::chat::{ChatMessageView, ChatSummary};
use crate::models::user::User;
use crate::utils::validation::validate;
use crate::AppState;

pub async fn list_chats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ChatListResponse>> {
    let chats = state.chat_service.list_for_user(user.id).await?;
    Ok(Json(ChatListResponse { chats }))
}

/// Chat history; marks the other side's messages as read
pub async fn get_messages(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatMessagesResponse>> {
    let messages = state.chat_service.read_messages(id, user.id).await?;
    let chat = state.chat_service.summary(id, user.id).await?;
    Ok(Json(ChatMessagesResponse { chat, messages }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ChatMessageView>)> {
    validate(&payload)?;
    let message = state.chat_service.send(id, user.id, &payload.text).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn close_chat(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSummary>> {
    Ok(Json(state.chat_service.close(id, user.id).await?))
}
