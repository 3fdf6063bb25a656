use axum::{extract::State, Json};

use crate::dto::auth_dto::{TelegramAuthRequest, TelegramAuthResponse};
use crate::error::Result;
use crate::utils::validation::validate;
use crate::AppState;

/// Verify init data sent in the body and return the stored profile.
pub async fn telegram_login(
    State(state): State<AppState>,
    Json(payload): Json<TelegramAuthRequest>,
) -> Result<Json<TelegramAuthResponse>> {
    validate(&payload)?;
    let verified = state.verifier.verify(&payload.init_data).map_err(|err| {
        tracing::warn!(code = err.code(), "Telegram login rejected");
        err
    })?;

    let user = state.user_service.upsert_from_telegram(&verified.user).await?;
    tracing::info!(user_id = %user.id, "Telegram login");

    Ok(Json(TelegramAuthResponse {
        user,
        auth_date: verified.auth_date,
        start_param: verified.start_param,
    }))
}
