use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::User;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelegramAuthRequest {
    #[validate(length(min = 1, max = 8192))]
    pub init_data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramAuthResponse {
    pub user: User,
    pub auth_date: DateTime<Utc>,
    pub start_param: Option<String>,
}
