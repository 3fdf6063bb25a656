use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::chat::{ChatMessageView, ChatSummary};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatListResponse {
    pub chats: Vec<ChatSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessagesResponse {
    pub chat: ChatSummary,
    pub messages: Vec<ChatMessageView>,
}
