use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::error::Error;
use crate::utils::telegram_auth::{InitDataError, VerifiedInitData};
use crate::AppState;

pub const INIT_DATA_HEADER: &str = "x-telegram-init-data";
const TMA_SCHEME: &str = "tma ";

enum InitDataSource {
    Found(String),
    Missing,
    UnsupportedScheme,
    Unreadable,
}

/// Reads init data from `Authorization: tma <initData>`, falling back to
/// the `X-Telegram-Init-Data` header.
fn extract_init_data(headers: &HeaderMap) -> InitDataSource {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let Ok(auth_str) = auth_header.to_str() else {
            return InitDataSource::Unreadable;
        };
        let scheme_len = TMA_SCHEME.len();
        if auth_str.len() >= scheme_len
            && auth_str[..scheme_len].eq_ignore_ascii_case(TMA_SCHEME)
        {
            return InitDataSource::Found(auth_str[scheme_len..].trim().to_string());
        }
        if headers.get(INIT_DATA_HEADER).is_none() {
            return InitDataSource::UnsupportedScheme;
        }
    }

    match headers.get(INIT_DATA_HEADER) {
        Some(value) => match value.to_str() {
            Ok(v) => InitDataSource::Found(v.trim().to_string()),
            Err(_) => InitDataSource::Unreadable,
        },
        None => InitDataSource::Missing,
    }
}

pub async fn require_telegram_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let init_data = match extract_init_data(req.headers()) {
        InitDataSource::Found(init_data) => init_data,
        InitDataSource::Missing => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Telegram init data is required", "code": "missing_init_data"})),
            )
                .into_response();
        }
        InitDataSource::UnsupportedScheme => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Authorization scheme must be tma", "code": "unsupported_scheme"})),
            )
                .into_response();
        }
        InitDataSource::Unreadable => {
            let err = InitDataError::MalformedInput("header is not visible ASCII".to_string());
            return Error::from(err).into_response();
        }
    };

    match state.verifier.verify(&init_data) {
        Ok(verified) => {
            req.extensions_mut().insert(verified);
            next.run(req).await
        }
        Err(err) => {
            match &err {
                InitDataError::MissingServerConfig => {
                    tracing::error!("TELEGRAM_BOT_TOKEN is not set; rejecting authenticated request")
                }
                other => tracing::warn!(code = other.code(), "Rejected Telegram init data"),
            }
            Error::from(err).into_response()
        }
    }
}

/// Resolves the verified Telegram identity to a stored [`User`], creating it
/// on first visit. Must run after [`require_telegram_auth`].
///
/// [`User`]: crate::models::user::User
pub async fn load_current_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(verified) = req.extensions().get::<VerifiedInitData>().cloned() else {
        return Error::Unauthorized("Telegram session is missing".to_string()).into_response();
    };

    match state.user_service.upsert_from_telegram(&verified.user).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}
