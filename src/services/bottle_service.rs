use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::bottle_dto::BottleDetailResponse;
use crate::error::{Error, Result};
use crate::models::bottle::{Bottle, BottleView, ReplyView};

// Columns of a `BottleView` for the viewer bound as $1, over `bottles b`.
const BOTTLE_VIEW_COLUMNS: &str = r#"
    b.id, b.content, b.status, (b.author_id = $1) AS is_mine,
    (SELECT COUNT(*) FROM bottle_replies r WHERE r.bottle_id = b.id) AS reply_count,
    b.caught_at, b.created_at
"#;

#[derive(Clone)]
pub struct BottleService {
    pool: PgPool,
}

impl BottleService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn throw(&self, author_id: Uuid, content: &str) -> Result<BottleView> {
        let content = non_blank(content)?;
        let bottle = sqlx::query_as::<_, BottleView>(
            r#"
            WITH inserted AS (
                INSERT INTO bottles (author_id, content)
                VALUES ($1, $2)
                RETURNING *
            )
            SELECT id, content, status, TRUE AS is_mine, 0::bigint AS reply_count, caught_at, created_at
            FROM inserted
            "#,
        )
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(bottle_id = %bottle.id, "Bottle thrown");
        Ok(bottle)
    }

    pub async fn list_mine(&self, user_id: Uuid) -> Result<Vec<BottleView>> {
        let sql = format!(
            "SELECT {} FROM bottles b WHERE b.author_id = $1 ORDER BY b.created_at DESC",
            BOTTLE_VIEW_COLUMNS
        );
        let bottles = sqlx::query_as::<_, BottleView>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bottles)
    }

    pub async fn list_caught(&self, user_id: Uuid) -> Result<Vec<BottleView>> {
        let sql = format!(
            "SELECT {} FROM bottles b WHERE b.caught_by = $1 ORDER BY b.caught_at DESC",
            BOTTLE_VIEW_COLUMNS
        );
        let bottles = sqlx::query_as::<_, BottleView>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(bottles)
    }

    /// Claims one random floating bottle written by someone else.
    ///
    /// Concurrent catchers never receive the same bottle: the candidate row is
    /// locked and already-locked rows are skipped.
    pub async fn catch_random(&self, user_id: Uuid) -> Result<Option<BottleView>> {
        let bottle = sqlx::query_as::<_, BottleView>(
            r#"
            WITH picked AS (
                SELECT id FROM bottles
                WHERE status = 'floating' AND author_id <> $1
                ORDER BY random()
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            ), caught AS (
                UPDATE bottles b
                SET status = 'caught', caught_by = $1, caught_at = NOW()
                FROM picked
                WHERE b.id = picked.id
                RETURNING b.*
            )
            SELECT c.id, c.content, c.status, FALSE AS is_mine,
                (SELECT COUNT(*) FROM bottle_replies r WHERE r.bottle_id = c.id) AS reply_count,
                c.caught_at, c.created_at
            FROM caught c
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(b) = &bottle {
            tracing::info!(bottle_id = %b.id, "Bottle caught");
        }
        Ok(bottle)
    }

    /// Throws a caught bottle back into the sea. Only its catcher may do so.
    pub async fn release(&self, bottle_id: Uuid, user_id: Uuid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE bottles
            SET status = 'floating', caught_by = NULL, caught_at = NULL
            WHERE id = $1 AND caught_by = $2
            "#,
        )
        .bind(bottle_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Bottle not found".to_string()));
        }
        Ok(())
    }

    pub async fn find(&self, bottle_id: Uuid) -> Result<Option<Bottle>> {
        let bottle = sqlx::query_as::<_, Bottle>("SELECT * FROM bottles WHERE id = $1")
            .bind(bottle_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(bottle)
    }

    /// Loads a bottle the user wrote or currently holds. Anyone else gets 404.
    pub async fn get_for_participant(&self, bottle_id: Uuid, user_id: Uuid) -> Result<Bottle> {
        self.find(bottle_id)
            .await?
            .filter(|b| b.is_participant(user_id))
            .ok_or_else(|| Error::NotFound("Bottle not found".to_string()))
    }

    pub async fn detail(&self, bottle_id: Uuid, user_id: Uuid) -> Result<BottleDetailResponse> {
        self.get_for_participant(bottle_id, user_id).await?;

        let sql = format!("SELECT {} FROM bottles b WHERE b.id = $2", BOTTLE_VIEW_COLUMNS);
        let bottle = sqlx::query_as::<_, BottleView>(&sql)
            .bind(user_id)
            .bind(bottle_id)
            .fetch_one(&self.pool)
            .await?;

        let replies = sqlx::query_as::<_, ReplyView>(
            r#"
            SELECT id, bottle_id, content, (author_id = $2) AS is_mine, created_at
            FROM bottle_replies
            WHERE bottle_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(bottle_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(BottleDetailResponse { bottle, replies })
    }

    pub async fn add_reply(
        &self,
        bottle_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<ReplyView> {
        let content = non_blank(content)?;
        self.get_for_participant(bottle_id, user_id).await?;

        let reply = sqlx::query_as::<_, ReplyView>(
            r#"
            INSERT INTO bottle_replies (bottle_id, author_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, bottle_id, content, TRUE AS is_mine, created_at
            "#,
        )
        .bind(bottle_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        Ok(reply)
    }

    pub async fn delete(&self, bottle_id: Uuid, author_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM bottles WHERE id = $1 AND author_id = $2")
            .bind(bottle_id)
            .bind(author_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Bottle not found".to_string()));
        }
        tracing::info!(bottle_id = %bottle_id, "Bottle deleted by author");
        Ok(())
    }
}

pub(crate) fn non_blank(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::BadRequest("Text must not be blank".to_string()));
    }
    Ok(trimmed)
}
