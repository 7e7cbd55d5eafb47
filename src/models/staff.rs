use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct StaffMember {
    pub staff_id: i64,
    pub user_id: i64,
    pub employee_id: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffDetails {
    pub staff_id: i64,
    pub employee_id: Option<String>,
    pub position: Option<String>,
}

impl From<StaffMember> for StaffDetails {
    fn from(s: StaffMember) -> Self {
        StaffDetails {
            staff_id: s.staff_id,
            employee_id: s.employee_id,
            position: s.position,
        }
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffFields {
    pub employee_id: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
}

pub async fn find_by_user_id(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<StaffMember>, sqlx::Error> {
    sqlx::query_as(
        "SELECT staff_id, user_id, employee_id, position, phone, created_at, updated_at
         FROM staff WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    fields: &StaffFields,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO staff (user_id, employee_id, position, phone, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&fields.employee_id)
    .bind(&fields.position)
    .bind(&fields.phone)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_by_user_id(
    pool: &SqlitePool,
    user_id: i64,
    fields: &StaffFields,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE staff SET employee_id = ?, position = ?, phone = ?, updated_at = ?
         WHERE user_id = ?",
    )
    .bind(&fields.employee_id)
    .bind(&fields.position)
    .bind(&fields.phone)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
