use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::bottle::Bottle;
use crate::models::chat::{Chat, ChatMessageView, ChatSummary};
use crate::services::bottle_service::non_blank;

// Columns of a `ChatSummary` for the viewer bound as $1, over `chats c`.
const CHAT_SUMMARY_COLUMNS: &str = r#"
    c.id, c.bottle_id, c.status,
    (SELECT COUNT(*) FROM chat_messages m
        WHERE m.chat_id = c.id AND m.sender_id <> $1 AND m.read_at IS NULL) AS unread_messages,
    (SELECT MAX(m.created_at) FROM chat_messages m WHERE m.chat_id = c.id) AS last_message_at,
    c.created_at
"#;

#[derive(Clone)]
pub struct ChatService {
    pool: PgPool,
}

impl ChatService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens the chat between a bottle's author and its current catcher, or
    /// returns the one that is already active.
    pub async fn open_for_bottle(&self, bottle: &Bottle, user_id: Uuid) -> Result<ChatSummary> {
        let catcher = bottle
            .caught_by
            .ok_or_else(|| Error::Conflict("Bottle has not been caught yet".to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO chats (bottle_id, user_a, user_b)
            VALUES ($1, $2, $3)
            ON CONFLICT (bottle_id, user_a, user_b) WHERE status = 'active' DO NOTHING
            "#,
        )
        .bind(bottle.id)
        .bind(bottle.author_id)
        .bind(catcher)
        .execute(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {} FROM chats c
            WHERE c.bottle_id = $2 AND c.user_a = $3 AND c.user_b = $4 AND c.status = 'active'
            "#,
            CHAT_SUMMARY_COLUMNS
        );
        let chat = sqlx::query_as::<_, ChatSummary>(&sql)
            .bind(user_id)
            .bind(bottle.id)
            .bind(bottle.author_id)
            .bind(catcher)
            .fetch_one(&self.pool)
            .await?;

        Ok(chat)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<ChatSummary>> {
        let sql = format!(
            r#"
            SELECT {} FROM chats c
            WHERE c.user_a = $1 OR c.user_b = $1
            ORDER BY last_message_at DESC NULLS LAST, created_at DESC
            "#,
            CHAT_SUMMARY_COLUMNS
        );
        let chats = sqlx::query_as::<_, ChatSummary>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(chats)
    }

    async fn get_for_participant(&self, chat_id: Uuid, user_id: Uuid) -> Result<Chat> {
        sqlx::query_as::<_, Chat>("SELECT * FROM chats WHERE id = $1")
            .bind(chat_id)
            .fetch_optional(&self.pool)
            .await?
            .filter(|c| c.is_participant(user_id))
            .ok_or_else(|| Error::NotFound("Chat not found".to_string()))
    }

    pub async fn summary(&self, chat_id: Uuid, user_id: Uuid) -> Result<ChatSummary> {
        self.get_for_participant(chat_id, user_id).await?;
        let sql = format!("SELECT {} FROM chats c WHERE c.id = $2", CHAT_SUMMARY_COLUMNS);
        let chat = sqlx::query_as::<_, ChatSummary>(&sql)
            .bind(user_id)
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(chat)
    }

    /// Returns the conversation and marks the other side's messages as read.
    pub async fn read_messages(&self, chat_id: Uuid, user_id: Uuid) -> Result<Vec<ChatMessageView>> {
        self.get_for_participant(chat_id, user_id).await?;

        let marked = sqlx::query(
            r#"
            UPDATE chat_messages
            SET read_at = NOW()
            WHERE chat_id = $1 AND sender_id <> $2 AND read_at IS NULL
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        tracing::debug!(chat_id = %chat_id, marked = marked.rows_affected(), "Messages marked read");

        let messages = sqlx::query_as::<_, ChatMessageView>(
            r#"
            SELECT id, text, (sender_id = $2) AS is_mine, created_at, read_at
            FROM chat_messages
            WHERE chat_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn send(&self, chat_id: Uuid, sender_id: Uuid, text: &str) -> Result<ChatMessageView> {
        let text = non_blank(text)?;
        let chat = self.get_for_participant(chat_id, sender_id).await?;
        if !chat.is_active() {
            return Err(Error::Conflict("Chat is closed".to_string()));
        }

        let message = sqlx::query_as::<_, ChatMessageView>(
            r#"
            INSERT INTO chat_messages (chat_id, sender_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, text, TRUE AS is_mine, created_at, read_at
            "#,
        )
        .bind(chat_id)
        .bind(sender_id)
        .bind(text)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    pub async fn close(&self, chat_id: Uuid, user_id: Uuid) -> Result<ChatSummary> {
        self.get_for_participant(chat_id, user_id).await?;
        sqlx::query(
            r#"
            UPDATE chats
            SET status = 'closed', closed_at = COALESCE(closed_at, NOW())
            WHERE id = $1
            "#,
        )
        .bind(chat_id)
        .execute(&self.pool)
        .await?;

        tracing::info!(chat_id = %chat_id, "Chat closed");
        self.summary(chat_id, user_id).await
    }
}
