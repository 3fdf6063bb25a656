use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::bottle::{BottleView, ReplyView};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBottleRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReplyRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleDetailResponse {
    pub bottle: BottleView,
    pub replies: Vec<ReplyView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BottleListResponse {
    pub bottles: Vec<BottleView>,
}
