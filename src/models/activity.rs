//! Append-only activity trail for mutating operations. Logging failures must
//! never fail the request that triggered them.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::warn;

pub async fn record(
    pool: &SqlitePool,
    kind: &str,
    description: &str,
    entity_id: Option<i64>,
    entity_type: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO activities (type, description, entity_id, entity_type, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(kind)
    .bind(description)
    .bind(entity_id)
    .bind(entity_type)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn log_activity(
    pool: &SqlitePool,
    kind: &str,
    description: &str,
    entity_id: Option<i64>,
    entity_type: Option<&str>,
) {
    if let Err(e) = record(pool, kind, description, entity_id, entity_type).await {
        warn!("Failed to log activity {kind}: {e}");
    }
}
