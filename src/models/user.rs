use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

use super::{staff, student};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Student => "student",
            Role::Staff => "staff",
            Role::Admin => "admin",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Approved,
    Suspended,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UserStatus::Pending => "pending",
            UserStatus::Approved => "approved",
            UserStatus::Suspended => "suspended",
        })
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User row joined with its role-specific details, as sent to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub phone: Option<String>,
    #[serde(flatten)]
    pub student: Option<student::StudentDetails>,
    #[serde(flatten)]
    pub staff: Option<staff::StaffDetails>,
}

const COLUMNS: &str = "id, name, email, password, role, status, created_at, updated_at";

pub async fn find_all(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM users ORDER BY name ASC"))
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as(&format!("SELECT {COLUMNS} FROM users WHERE email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &SqlitePool,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
    status: UserStatus,
) -> Result<i64, sqlx::Error> {
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO users (name, email, password, role, status, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .bind(status)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    name: &str,
    email: &str,
    role: Role,
    status: UserStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE users SET name = ?, email = ?, role = ?, status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(name)
    .bind(email)
    .bind(role)
    .bind(status)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_name(pool: &SqlitePool, id: i64, name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_status(
    pool: &SqlitePool,
    id: i64,
    status: UserStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_password(
    pool: &SqlitePool,
    id: i64,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET password = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_by_role(pool: &SqlitePool, role: Role) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(id) FROM users WHERE role = ?")
        .bind(role)
        .fetch_one(pool)
        .await
}

pub async fn count_approved_students(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(id) FROM users WHERE role = 'student' AND status = 'approved'")
        .fetch_one(pool)
        .await
}

/// Assembles the client-facing profile for one user, pulling in the
/// student or staff row depending on the role.
pub async fn load_profile(pool: &SqlitePool, id: i64) -> Result<Option<Profile>, sqlx::Error> {
    let Some(user) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    Ok(Some(assemble_profile(pool, user).await?))
}

pub async fn assemble_profile(pool: &SqlitePool, user: User) -> Result<Profile, sqlx::Error> {
    let mut profile = Profile {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        status: user.status,
        phone: None,
        student: None,
        staff: None,
    };

    match user.role {
        Role::Student => {
            if let Some(details) = student::find_by_user_id(pool, user.id).await? {
                profile.phone = details.phone.clone();
                profile.student = Some(details.into());
            }
        }
        Role::Staff => {
            if let Some(details) = staff::find_by_user_id(pool, user.id).await? {
                profile.phone = details.phone.clone();
                profile.staff = Some(details.into());
            }
        }
        Role::Admin => {}
    }

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_create_and_find() {
        let pool = test_pool().await;

        let id = create(&pool, "Asha", "asha@example.com", "hash", Role::Student, UserStatus::Pending)
            .await
            .unwrap();

        let user = find_by_email(&pool, "asha@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.role, Role::Student);
        assert_eq!(user.status, UserStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = test_pool().await;

        create(&pool, "A", "same@example.com", "h", Role::Student, UserStatus::Pending)
            .await
            .unwrap();
        let err = create(&pool, "B", "same@example.com", "h", Role::Staff, UserStatus::Approved)
            .await
            .unwrap_err();

        match err {
            sqlx::Error::Database(db) => assert!(db.is_unique_violation()),
            other => panic!("expected unique violation, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_status_update() {
        let pool = test_pool().await;

        let id = create(&pool, "Asha", "a@example.com", "h", Role::Student, UserStatus::Pending)
            .await
            .unwrap();
        assert!(update_status(&pool, id, UserStatus::Approved).await.unwrap());

        let user = find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(user.status, UserStatus::Approved);
        assert_eq!(count_approved_students(&pool).await.unwrap(), 1);
    }
}
