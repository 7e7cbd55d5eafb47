//! Meal attendance rows. One row per (student, date, meal type); the unique
//! index backs that invariant and duplicate inserts surface as conflicts.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::meal::MealType;

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: i64,
    pub user_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub marked_at: DateTime<Utc>,
    pub marked_by_user_id: Option<i64>,
    pub is_manual_entry: bool,
    pub notes: Option<String>,
}

/// Report row with student and marker names joined in.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub roll_no: Option<String>,
    pub enrollment_no: Option<String>,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub marked_at: DateTime<Utc>,
    pub marked_by_user_name: Option<String>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub is_manual_entry: bool,
    pub notes: Option<String>,
}

#[derive(Debug)]
pub struct NewAttendance {
    pub user_id: i64,
    pub date: NaiveDate,
    pub meal_type: MealType,
    pub marked_by_user_id: Option<i64>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub is_manual_entry: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Default)]
pub struct ReportFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub meal_type: Option<MealType>,
    pub user_id: Option<i64>,
    pub roll_no: Option<String>,
    pub enrollment_no: Option<String>,
    pub is_manual_entry: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub total_meals: i64,
    pub distinct_students: i64,
    pub breakfast_count: i64,
    pub lunch_count: i64,
    pub dinner_count: i64,
}

pub async fn insert(pool: &SqlitePool, record: &NewAttendance) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attendance
         (user_id, date, meal_type, marked_at, marked_by_user_id, ip_address, device_info, \
          is_manual_entry, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.user_id)
    .bind(record.date)
    .bind(record.meal_type)
    .bind(Utc::now())
    .bind(record.marked_by_user_id)
    .bind(&record.ip_address)
    .bind(&record.device_info)
    .bind(record.is_manual_entry)
    .bind(&record.notes)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn for_student_range(
    pool: &SqlitePool,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Attendance>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, user_id, date, meal_type, marked_at, marked_by_user_id, is_manual_entry, notes
         FROM attendance
         WHERE user_id = ? AND date BETWEEN ? AND ?
         ORDER BY date ASC, marked_at ASC",
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

/// Meal types a student has already had marked on a given day.
pub async fn meals_marked_on(
    pool: &SqlitePool,
    user_id: i64,
    date: NaiveDate,
) -> Result<Vec<MealType>, sqlx::Error> {
    sqlx::query_scalar("SELECT meal_type FROM attendance WHERE user_id = ? AND date = ?")
        .bind(user_id)
        .bind(date)
        .fetch_all(pool)
        .await
}

/// Filtered attendance report with student and marker names.
pub async fn report(
    pool: &SqlitePool,
    filter: &ReportFilter,
) -> Result<Vec<AttendanceRecord>, sqlx::Error> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT a.id, a.user_id, u.name AS user_name, s.roll_no, s.enrollment_no, a.date, \
         a.meal_type, a.marked_at, m.name AS marked_by_user_name, a.ip_address, a.device_info, \
         a.is_manual_entry, a.notes
         FROM attendance a
         JOIN users u ON a.user_id = u.id
         LEFT JOIN students s ON u.id = s.user_id
         LEFT JOIN users m ON a.marked_by_user_id = m.id
         WHERE 1=1",
    );

    if let Some(start) = filter.start_date {
        qb.push(" AND a.date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND a.date <= ").push_bind(end);
    }
    if let Some(meal) = filter.meal_type {
        qb.push(" AND a.meal_type = ").push_bind(meal);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND a.user_id = ").push_bind(user_id);
    }
    if let Some(roll_no) = &filter.roll_no {
        qb.push(" AND s.roll_no = ").push_bind(roll_no);
    }
    if let Some(enrollment_no) = &filter.enrollment_no {
        qb.push(" AND s.enrollment_no = ").push_bind(enrollment_no);
    }
    if let Some(manual) = filter.is_manual_entry {
        qb.push(" AND a.is_manual_entry = ").push_bind(manual);
    }

    qb.push(" ORDER BY a.date DESC, a.marked_at DESC");

    if let Some(limit) = filter.limit {
        if limit > 0 {
            qb.push(" LIMIT ").push_bind(limit);
        }
    }

    qb.build_query_as().fetch_all(pool).await
}

pub async fn day_summary(pool: &SqlitePool, date: NaiveDate) -> Result<DaySummary, sqlx::Error> {
    sqlx::query_as(
        "SELECT
            COUNT(id) AS total_meals,
            COUNT(DISTINCT user_id) AS distinct_students,
            COALESCE(SUM(CASE WHEN meal_type = 'breakfast' THEN 1 ELSE 0 END), 0) AS breakfast_count,
            COALESCE(SUM(CASE WHEN meal_type = 'lunch' THEN 1 ELSE 0 END), 0) AS lunch_count,
            COALESCE(SUM(CASE WHEN meal_type = 'dinner' THEN 1 ELSE 0 END), 0) AS dinner_count
         FROM attendance WHERE date = ?",
    )
    .bind(date)
    .fetch_one(pool)
    .await
}

pub async fn count_between(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(id) FROM attendance WHERE date BETWEEN ? AND ?")
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await
}

/// Monday-to-Sunday bounds of the ISO week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (start, start + Duration::days(6))
}

pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day(1).unwrap_or(date);
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    let end = next_month.map(|d| d - Duration::days(1)).unwrap_or(date);
    (start, end)
}

pub fn days_in_month(date: NaiveDate) -> i64 {
    let (start, end) = month_bounds(date);
    (end - start).num_days() + 1
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
    fn test_week_bounds_monday_start() {
        // 2026-03-11 is a Wednesday
        let (start, end) = week_bounds(d("2026-03-11"));
        assert_eq!(start, d("2026-03-09"));
        assert_eq!(end, d("2026-03-15"));

        // a Monday is its own week start
        let (start, _) = week_bounds(d("2026-03-09"));
        assert_eq!(start, d("2026-03-09"));
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(month_bounds(d("2026-02-15")), (d("2026-02-01"), d("2026-02-28")));
        assert_eq!(month_bounds(d("2026-12-31")), (d("2026-12-01"), d("2026-12-31")));
        assert_eq!(days_in_month(d("2024-02-10")), 29);
    }

    async fn seed_student(pool: &SqlitePool, email: &str) -> i64 {
        user::create(pool, "Student", email, "h", Role::Student, UserStatus::Approved)
            .await
            .unwrap()
    }

    fn record(user_id: i64, date: NaiveDate, meal: MealType) -> NewAttendance {
        NewAttendance {
            user_id,
            date,
            meal_type: meal,
            marked_by_user_id: None,
            ip_address: None,
            device_info: None,
            is_manual_entry: false,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_meal_rejected() {
        let pool = test_pool().await;
        let user_id = seed_student(&pool, "a@example.com").await;

        insert(&pool, &record(user_id, d("2026-03-10"), MealType::Lunch)).await.unwrap();

        let err = insert(&pool, &record(user_id, d("2026-03-10"), MealType::Lunch))
            .await
            .unwrap_err();
        match err {
            sqlx::Error::Database(db) => assert!(db.is_unique_violation()),
            other => panic!("expected unique violation, got {other}"),
        }

        // a different meal on the same day is fine
        insert(&pool, &record(user_id, d("2026-03-10"), MealType::Dinner)).await.unwrap();
        // same meal on another day is fine
        insert(&pool, &record(user_id, d("2026-03-11"), MealType::Lunch)).await.unwrap();
    }

    #[tokio::test]
    async fn test_meals_marked_on() {
        let pool = test_pool().await;
        let user_id = seed_student(&pool, "a@example.com").await;

        insert(&pool, &record(user_id, d("2026-03-10"), MealType::Breakfast)).await.unwrap();
        insert(&pool, &record(user_id, d("2026-03-10"), MealType::Dinner)).await.unwrap();

        let meals = meals_marked_on(&pool, user_id, d("2026-03-10")).await.unwrap();
        assert!(meals.contains(&MealType::Breakfast));
        assert!(meals.contains(&MealType::Dinner));
        assert!(!meals.contains(&MealType::Lunch));
    }

    #[tokio::test]
    async fn test_report_filters() {
        let pool = test_pool().await;
        let first = seed_student(&pool, "a@example.com").await;
        let second = seed_student(&pool, "b@example.com").await;

        insert(&pool, &record(first, d("2026-03-10"), MealType::Lunch)).await.unwrap();
        insert(&pool, &record(second, d("2026-03-10"), MealType::Lunch)).await.unwrap();
        insert(&pool, &record(first, d("2026-03-11"), MealType::Breakfast)).await.unwrap();

        let all = report(&pool, &ReportFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let by_user = report(
            &pool,
            &ReportFilter {
                user_id: Some(first),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(by_user.len(), 2);

        let lunches_on_day = report(
            &pool,
            &ReportFilter {
                start_date: Some(d("2026-03-10")),
                end_date: Some(d("2026-03-10")),
                meal_type: Some(MealType::Lunch),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(lunches_on_day.len(), 2);

        let limited = report(
            &pool,
            &ReportFilter {
                limit: Some(1),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_day_summary_counts() {
        let pool = test_pool().await;
        let first = seed_student(&pool, "a@example.com").await;
        let second = seed_student(&pool, "b@example.com").await;

        insert(&pool, &record(first, d("2026-03-10"), MealType::Breakfast)).await.unwrap();
        insert(&pool, &record(first, d("2026-03-10"), MealType::Lunch)).await.unwrap();
        insert(&pool, &record(second, d("2026-03-10"), MealType::Lunch)).await.unwrap();

        let summary = day_summary(&pool, d("2026-03-10")).await.unwrap();
        assert_eq!(summary.total_meals, 3);
        assert_eq!(summary.distinct_students, 2);
        assert_eq!(summary.breakfast_count, 1);
        assert_eq!(summary.lunch_count, 2);
        assert_eq!(summary.dinner_count, 0);
    }
}
