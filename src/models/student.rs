use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct Student {
    pub student_id: i64,
    pub user_id: i64,
    pub roll_no: Option<String>,
    pub enrollment_no: Option<String>,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The subset of student fields exposed in profiles.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDetails {
    pub student_id: i64,
    pub roll_no: Option<String>,
    #[serde(rename = "enrollmentNumber")]
    pub enrollment_no: Option<String>,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub course: Option<String>,
}

impl From<Student> for StudentDetails {
    fn from(s: Student) -> Self {
        StudentDetails {
            student_id: s.student_id,
            roll_no: s.roll_no,
            enrollment_no: s.enrollment_no,
            branch: s.branch,
            year: s.year,
            course: s.course,
        }
    }
}

/// Mutable student fields, used both on creation and update.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFields {
    pub roll_no: Option<String>,
    pub enrollment_no: Option<String>,
    pub branch: Option<String>,
    pub year: Option<String>,
    pub phone: Option<String>,
    pub course: Option<String>,
}

const COLUMNS: &str = "student_id, user_id, roll_no, enrollment_no, branch, year, phone, course, \
                       created_at, updated_at";

pub async fn find_by_user_id(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM students WHERE user_id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn roll_no_taken(pool: &SqlitePool, roll_no: &str) -> Result<bool, sqlx::Error> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT student_id FROM students WHERE roll_no = ? LIMIT 1")
            .bind(roll_no)
            .fetch_optional(pool)
            .await?;
    Ok(existing.is_some())
}

pub async fn enrollment_no_taken(
    pool: &SqlitePool,
    enrollment_no: &str,
) -> Result<bool, sqlx::Error> {
    let existing: Option<i64> =
        sqlx::query_scalar("SELECT student_id FROM students WHERE enrollment_no = ? LIMIT 1")
            .bind(enrollment_no)
            .fetch_optional(pool)
            .await?;
    Ok(existing.is_some())
}

pub async fn create(
    pool: &SqlitePool,
    user_id: i64,
    fields: &StudentFields,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO students (user_id, roll_no, enrollment_no, branch, year, phone, course, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&fields.roll_no)
    .bind(&fields.enrollment_no)
    .bind(&fields.branch)
    .bind(&fields.year)
    .bind(&fields.phone)
    .bind(&fields.course)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update_by_user_id(
    pool: &SqlitePool,
    user_id: i64,
    fields: &StudentFields,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE students SET roll_no = ?, enrollment_no = ?, branch = ?, year = ?, phone = ?, \
         course = ?, updated_at = ? WHERE user_id = ?",
    )
    .bind(&fields.roll_no)
    .bind(&fields.enrollment_no)
    .bind(&fields.branch)
    .bind(&fields.year)
    .bind(&fields.phone)
    .bind(&fields.course)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Approved students with their user names, for the manual-lookup screen.
#[derive(Debug, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovedStudent {
    pub id: i64,
    pub name: String,
    pub roll_no: Option<String>,
    #[serde(rename = "enrollmentNumber")]
    pub enrollment_no: Option<String>,
    pub course: Option<String>,
    pub year: Option<String>,
    pub branch: Option<String>,
    pub phone: Option<String>,
}

pub async fn all_approved(pool: &SqlitePool) -> Result<Vec<ApprovedStudent>, sqlx::Error> {
    sqlx::query_as(
        "SELECT u.id, u.name, s.roll_no, s.enrollment_no, s.course, s.year, s.branch, s.phone
         FROM users u
         JOIN students s ON u.id = s.user_id
         WHERE u.role = 'student' AND u.status = 'approved'
         ORDER BY u.name ASC",
    )
    .fetch_all(pool)
    .await
}
