use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

use crate::dto::bottle_dto::{
    BottleDetailResponse, BottleListResponse, CreateBottleRequest, CreateReplyRequest,
};
use crate::error::{Error, Result};
use crate::models::bottle::{BottleView, ReplyView};
use crate::models::chat::ChatSummary;
use crate::models::user::User;
use crate::utils::validation::validate;
use crate::AppState;

pub async fn throw_bottle(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateBottleRequest>,
) -> Result<(StatusCode, Json<BottleView>)> {
    validate(&payload)?;
    let bottle = state.bottle_service.throw(user.id, &payload.content).await?;
    Ok((StatusCode::CREATED, Json(bottle)))
}

pub async fn list_my_bottles(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<BottleListResponse>> {
    let bottles = state.bottle_service.list_mine(user.id).await?;
    Ok(Json(BottleListResponse { bottles }))
}

pub async fn list_caught_bottles(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<BottleListResponse>> {
    let bottles = state.bottle_service.list_caught(user.id).await?;
    Ok(Json(BottleListResponse { bottles }))
}

/// Fish a random bottle out of the sea
pub async fn catch_bottle(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<BottleView>> {
    state
        .bottle_service
        .catch_random(user.id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::NotFound("The sea is empty right now".to_string()))
}

pub async fn get_bottle(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<BottleDetailResponse>> {
    Ok(Json(state.bottle_service.detail(id, user.id).await?))
}

pub async fn release_bottle(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.bottle_service.release(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_bottle(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.bottle_service.delete(id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reply_to_bottle(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateReplyRequest>,
) -> Result<(StatusCode, Json<ReplyView>)> {
    validate(&payload)?;
    let reply = state
        .bottle_service
        .add_reply(id, user.id, &payload.content)
        .await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

/// Open (or reopen) the private chat between a bottle's author and its catcher
pub async fn open_chat(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatSummary>> {
    let bottle = state.bottle_service.get_for_participant(id, user.id).await?;
    let chat = state.chat_service.open_for_bottle(&bottle, user.id).await?;
    Ok(Json(chat))
}
