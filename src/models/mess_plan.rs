//! Mess-plan requests: a student books an inclusive date range, which an
//! admin approves or rejects. A student can never hold two pending/approved
//! plans whose ranges touch.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PlanStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlanStatus::Pending => "pending",
            PlanStatus::Approved => "approved",
            PlanStatus::Rejected => "rejected",
        })
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessPlan {
    pub id: i64,
    #[serde(rename = "studentId")]
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PlanStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessPlanWithStudent {
    pub id: i64,
    #[serde(rename = "studentId")]
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PlanStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub student_name: String,
    #[serde(rename = "enrollmentNumber")]
    pub enrollment_no: Option<String>,
}

/// Inclusive date ranges overlap when each starts no later than the other
/// ends.
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start <= b_end && b_start <= a_end
}

/// Whether the requested range collides with any pending or approved plan.
pub fn has_conflict(existing: &[MessPlan], start: NaiveDate, end: NaiveDate) -> bool {
    existing
        .iter()
        .filter(|plan| matches!(plan.status, PlanStatus::Pending | PlanStatus::Approved))
        .any(|plan| ranges_overlap(start, end, plan.start_date, plan.end_date))
}

const COLUMNS: &str =
    "id, user_id, start_date, end_date, status, rejection_reason, created_at, updated_at";

const JOINED_COLUMNS: &str = "mp.id, mp.user_id, mp.start_date, mp.end_date, mp.status, \
     mp.rejection_reason, mp.created_at, mp.updated_at, \
     u.name AS student_name, s.enrollment_no";

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<MessPlan>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM mess_plans WHERE user_id = ? ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<MessPlan>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM mess_plans WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO mess_plans (user_id, start_date, end_date, status, created_at, updated_at)
         VALUES (?, ?, ?, 'pending', ?, ?)",
    )
    .bind(user_id)
    .bind(start_date)
    .bind(end_date)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    status: PlanStatus,
    rejection_reason: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE mess_plans SET status = ?, rejection_reason = ?, updated_at = ? WHERE id = ?",
    )
    .bind(status)
    .bind(rejection_reason)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// The approved plan covering `date`, if the student has one.
pub async fn active_for(
    pool: &SqlitePool,
    user_id: i64,
    date: NaiveDate,
) -> Result<Option<MessPlan>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {COLUMNS} FROM mess_plans
         WHERE user_id = ? AND status = 'approved' AND ? BETWEEN start_date AND end_date"
    ))
    .bind(user_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

pub async fn all_with_student(
    pool: &SqlitePool,
) -> Result<Vec<MessPlanWithStudent>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {JOINED_COLUMNS}
         FROM mess_plans mp
         JOIN users u ON mp.user_id = u.id
         LEFT JOIN students s ON u.id = s.user_id
         ORDER BY mp.created_at DESC"
    ))
    .fetch_all(pool)
    .await
}

pub async fn find_by_id_with_student(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<MessPlanWithStudent>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {JOINED_COLUMNS}
         FROM mess_plans mp
         JOIN users u ON mp.user_id = u.id
         LEFT JOIN students s ON u.id = s.user_id
         WHERE mp.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn pending_with_student(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<MessPlanWithStudent>, sqlx::Error> {
    sqlx::query_as(&format!(
        "SELECT {JOINED_COLUMNS}
         FROM mess_plans mp
         JOIN users u ON mp.user_id = u.id
         LEFT JOIN students s ON u.id = s.user_id
         WHERE mp.status = 'pending'
         ORDER BY mp.created_at DESC
         LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count_by_status(pool: &SqlitePool, status: PlanStatus) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(id) FROM mess_plans WHERE status = ?")
        .bind(status)
        .fetch_one(pool)
        .await
}

/// Drops settled plans that ended before the cutoff. Pending plans are kept
/// regardless of age.
pub async fn delete_ended_before(
    pool: &SqlitePool,
    cutoff: NaiveDate,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM mess_plans WHERE end_date < ? AND status IN ('approved', 'rejected')",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::models::user::{self, Role, UserStatus};

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_overlap_detection() {
        // identical, partial, contained, touching at a single day
        assert!(ranges_overlap(d("2026-01-01"), d("2026-01-10"), d("2026-01-01"), d("2026-01-10")));
        assert!(ranges_overlap(d("2026-01-01"), d("2026-01-10"), d("2026-01-05"), d("2026-01-15")));
        assert!(ranges_overlap(d("2026-01-01"), d("2026-01-31"), d("2026-01-10"), d("2026-01-12")));
        assert!(ranges_overlap(d("2026-01-01"), d("2026-01-10"), d("2026-01-10"), d("2026-01-20")));
    }

    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        assert!(!ranges_overlap(d("2026-01-01"), d("2026-01-10"), d("2026-01-11"), d("2026-01-20")));
        assert!(!ranges_overlap(d("2026-01-11"), d("2026-01-20"), d("2026-01-01"), d("2026-01-10")));
    }

    #[test]
    fn test_rejected_plans_do_not_conflict() {
        let plan = MessPlan {
            id: 1,
            user_id: 1,
            start_date: d("2026-01-01"),
            end_date: d("2026-01-31"),
            status: PlanStatus::Rejected,
            rejection_reason: Some("duplicate".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(!has_conflict(&[plan.clone()], d("2026-01-05"), d("2026-01-20")));

        let approved = MessPlan {
            status: PlanStatus::Approved,
            ..plan
        };
        assert!(has_conflict(&[approved], d("2026-01-05"), d("2026-01-20")));
    }

    async fn seed_student(pool: &SqlitePool) -> i64 {
        user::create(pool, "Asha", "asha@example.com", "h", Role::Student, UserStatus::Approved)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_active_plan_lookup() {
        let pool = test_pool().await;
        let user_id = seed_student(&pool).await;

        let plan_id = create(&pool, user_id, d("2026-03-01"), d("2026-03-31")).await.unwrap();

        // pending plans are not active
        assert!(active_for(&pool, user_id, d("2026-03-15")).await.unwrap().is_none());

        update_status(&pool, plan_id, PlanStatus::Approved, None).await.unwrap();
        assert!(active_for(&pool, user_id, d("2026-03-15")).await.unwrap().is_some());
        assert!(active_for(&pool, user_id, d("2026-04-01")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_keeps_pending_plans() {
        let pool = test_pool().await;
        let user_id = seed_student(&pool).await;

        let old_approved = create(&pool, user_id, d("2025-01-01"), d("2025-01-31")).await.unwrap();
        update_status(&pool, old_approved, PlanStatus::Approved, None).await.unwrap();
        create(&pool, user_id, d("2025-02-01"), d("2025-02-28")).await.unwrap();

        let deleted = delete_ended_before(&pool, d("2026-01-01")).await.unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(find_by_user(&pool, user_id).await.unwrap().len(), 1);
    }
}
