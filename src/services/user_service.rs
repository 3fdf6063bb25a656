use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::{User, UserStats};
use crate::utils::telegram_auth::TelegramUser;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the user on first sight and refreshes the Telegram-owned
    /// fields on every later visit.
    pub async fn upsert_from_telegram(&self, tg: &TelegramUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (telegram_id, first_name, last_name, username, language_code, is_premium, photo_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (telegram_id) DO UPDATE SET
                first_name = EXCLUDED.first_name,
                last_name = EXCLUDED.last_name,
                username = EXCLUDED.username,
                language_code = EXCLUDED.language_code,
                is_premium = EXCLUDED.is_premium,
                photo_url = EXCLUDED.photo_url,
                updated_at = NOW(),
                last_seen_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tg.id)
        .bind(&tg.first_name)
        .bind(&tg.last_name)
        .bind(&tg.username)
        .bind(&tg.language_code)
        .bind(tg.is_premium.unwrap_or(false))
        .bind(&tg.photo_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    /// `None` leaves a field untouched; an empty string clears it.
    pub async fn update_profile(
        &self,
        id: Uuid,
        nickname: Option<String>,
        bio: Option<String>,
    ) -> Result<User> {
        let nickname = nickname.map(|v| v.trim().to_string());
        let bio = bio.map(|v| v.trim().to_string());

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                nickname = CASE WHEN $2::text IS NULL THEN nickname ELSE NULLIF($2, '') END,
                bio = CASE WHEN $3::text IS NULL THEN bio ELSE NULLIF($3, '') END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(nickname)
        .bind(bio)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;

        Ok(user)
    }

    pub async fn stats(&self, id: Uuid) -> Result<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM bottles WHERE author_id = $1) AS bottles_thrown,
                (SELECT COUNT(*) FROM bottles WHERE caught_by = $1) AS bottles_caught,
                (SELECT COUNT(*) FROM bottle_replies WHERE author_id = $1) AS replies_written,
                (SELECT COUNT(*) FROM chats
                    WHERE (user_a = $1 OR user_b = $1) AND status = 'active') AS active_chats
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(stats)
    }
}
