use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Bottle {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub status: String,
    pub caught_by: Option<Uuid>,
    pub caught_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Bottle {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.author_id == user_id || self.caught_by == Some(user_id)
    }
}

/// A bottle as seen by one user. Never carries the other party's identity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BottleView {
    pub id: Uuid,
    pub content: String,
    pub status: String,
    pub is_mine: bool,
    pub reply_count: i64,
    pub caught_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ReplyView {
    pub id: Uuid,
    pub bottle_id: Uuid,
    pub content: String,
    pub is_mine: bool,
    pub created_at: DateTime<Utc>,
}
