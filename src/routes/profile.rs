use axum::{extract::State, Extension, Json};

use crate::dto::profile_dto::{ProfileResponse, UpdateProfileRequest};
use crate::error::Result;
use crate::models::user::{User, UserStats};
use crate::utils::validation::validate;
use crate::AppState;

pub async fn get_me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<ProfileResponse>> {
    let stats = state.user_service.stats(user.id).await?;
    Ok(Json(ProfileResponse { user, stats }))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>> {
    validate(&payload)?;
    let updated = state
        .user_service
        .update_profile(user.id, payload.nickname, payload.bio)
        .await?;
    Ok(Json(updated))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<UserStats>> {
    Ok(Json(state.user_service.stats(user.id).await?))
}
