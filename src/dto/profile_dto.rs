use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::user::{User, UserStats};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 32))]
    pub nickname: Option<String>,
    #[validate(length(max = 300))]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: User,
    pub stats: UserStats,
}
