//! Storage for delegated user sessions, keyed by Telegram user id.
//!
//! The session column holds the serialized MTProto session (base64 of the
//! raw session bytes), enough to reconnect the user client later.

use anyhow::Result;

use super::Database;

#[derive(sqlx::FromRow)]
struct SessionRow {
    session: String,
}

impl Database {
    /// Stores or replaces the session string for a user.
    pub async fn save_session(&self, user_id: i64, session: &str) -> Result<()> {
        sqlx::query("REPLACE INTO sessions (user_id, session) VALUES (?, ?)")
            .bind(user_id)
            .bind(session)
            .execute(self.pool())
            .await?;
        tracing::debug!(user_id, "Saved user session");
        Ok(())
    }

    pub async fn get_session(&self, user_id: i64) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT session FROM sessions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(|r| r.session))
    }

    /// Removes the stored session. Returns whether one existed.
    pub async fn delete_session(&self, user_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
