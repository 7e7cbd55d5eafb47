use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(rename = "read")]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

pub async fn notify(
    pool: &SqlitePool,
    user_id: i64,
    kind: &str,
    message: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO notifications (user_id, type, message, is_read, created_at)
         VALUES (?, ?, ?, 0, ?)",
    )
    .bind(user_id)
    .bind(kind)
    .bind(message)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn recent_for(
    pool: &SqlitePool,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, user_id, type, message, is_read, created_at
         FROM notifications
         WHERE user_id = ?
         ORDER BY created_at DESC
         LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::user::{self, Role, UserStatus};

    #[tokio::test]
    async fn test_recent_is_bounded_and_newest_first() {
        let pool = test_pool().await;
        let user_id = user::create(
            &pool,
            "Asha",
            "a@example.com",
            "h",
            Role::Student,
            UserStatus::Approved,
        )
        .await
        .unwrap();

        for i in 0..7 {
            notify(&pool, user_id, "mess_plan", &format!("update {i}")).await.unwrap();
        }

        let recent = recent_for(&pool, user_id, 5).await.unwrap();
        assert_eq!(recent.len(), 5);
        assert!(!recent[0].is_read);
    }
}
