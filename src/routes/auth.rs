use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{self, AuthUser},
    error::AppError,
    models::{
        student::{self, StudentFields},
        user::{self, Role, UserStatus},
    },
    state::AppState,
};

use super::{ok, ok_message};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    name: String,
    email: String,
    password: String,
    roll_no: String,
    enrollment_no: String,
    branch: String,
    year: String,
    phone: String,
    course: Option<String>,
}

fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    let fail = |message: &str| Err(AppError::Validation(message.to_string()));

    if req.name.trim().is_empty() {
        return fail("Full Name is required");
    }

    let email_re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    if !email_re.is_match(req.email.trim()) {
        return fail("Invalid email address");
    }

    if req.password.len() < 6 {
        return fail("Password must be at least 6 characters");
    }
    if req.roll_no.trim().is_empty() {
        return fail("Roll Number is required");
    }
    if req.enrollment_no.trim().is_empty() {
        return fail("Enrollment Number is required");
    }
    if req.branch.trim().is_empty() {
        return fail("Branch is required");
    }
    if req.year.trim().is_empty() {
        return fail("Year is required");
    }

    let digits = req.phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(10..=15).contains(&digits) || digits != req.phone.len() {
        return fail("Phone must be 10 to 15 digits");
    }

    Ok(())
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    validate_registration(&req)?;
    let email = req.email.trim().to_lowercase();

    if user::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict(
            "Email already registered. Please use a different email or log in.".to_string(),
        ));
    }
    if student::roll_no_taken(&state.pool, req.roll_no.trim()).await? {
        return Err(AppError::Conflict("Roll Number already registered.".to_string()));
    }
    if student::enrollment_no_taken(&state.pool, req.enrollment_no.trim()).await? {
        return Err(AppError::Conflict("Enrollment Number already registered.".to_string()));
    }

    let password_hash = auth::hash_password(&req.password)?;

    let user_id = user::create(
        &state.pool,
        req.name.trim(),
        &email,
        &password_hash,
        Role::Student,
        UserStatus::Pending,
    )
    .await?;

    let fields = StudentFields {
        roll_no: Some(req.roll_no.trim().to_string()),
        enrollment_no: Some(req.enrollment_no.trim().to_string()),
        branch: Some(req.branch.trim().to_string()),
        year: Some(req.year.trim().to_string()),
        phone: Some(req.phone.trim().to_string()),
        course: req.course.clone(),
    };
    let student_id = student::create(&state.pool, user_id, &fields).await?;

    info!("Registered student user {user_id} (awaiting approval)");

    Ok((
        StatusCode::CREATED,
        ok_message(
            json!({ "userId": user_id, "studentId": student_id }),
            "Registration submitted. Your account is awaiting admin approval.",
        ),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
    role: Role,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let email = req.email.trim().to_lowercase();

    let found = user::find_by_email(&state.pool, &email).await?;
    let account = match found {
        Some(account) if account.role == req.role => account,
        _ => {
            return Err(AppError::Unauthorized(
                "No account with this email for the selected role.",
            ));
        }
    };

    match account.status {
        UserStatus::Pending => {
            return Err(AppError::Forbidden("Your account is awaiting admin approval."));
        }
        UserStatus::Suspended => {
            return Err(AppError::Forbidden("Your account has been suspended."));
        }
        UserStatus::Approved => {}
    }

    if !auth::verify_password(&req.password, &account.password)? {
        return Err(AppError::Unauthorized("Incorrect password."));
    }

    let token = auth::issue_token(
        &state.jwt_encoding,
        account.id,
        account.role,
        state.config.token_expiry_hours,
    )?;

    let profile = user::assemble_profile(&state.pool, account).await?;

    Ok(ok(json!({ "token": token, "user": profile })))
}

async fn me(
    State(state): State<Arc<AppState>>,
    caller: AuthUser,
) -> Result<Json<Value>, AppError> {
    let profile = user::load_profile(&state.pool, caller.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(ok(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::test_state;

    async fn seed(state: &Arc<AppState>, email: &str, role: Role, status: UserStatus) -> i64 {
        let hash = auth::hash_password("hunter2-but-longer").unwrap();
        user::create(&state.pool, "Asha", email, &hash, role, status)
            .await
            .unwrap()
    }

    fn login_request(email: &str, password: &str, role: Role) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            role,
        }
    }

    #[tokio::test]
    async fn test_pending_user_cannot_log_in() {
        let state = test_state().await;
        seed(&state, "p@example.com", Role::Student, UserStatus::Pending).await;

        let err = login(
            State(state),
            Json(login_request("p@example.com", "hunter2-but-longer", Role::Student)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_suspended_user_cannot_log_in() {
        let state = test_state().await;
        seed(&state, "s@example.com", Role::Student, UserStatus::Suspended).await;

        let err = login(
            State(state),
            Json(login_request("s@example.com", "hunter2-but-longer", Role::Student)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_role_mismatch_rejected() {
        let state = test_state().await;
        seed(&state, "a@example.com", Role::Student, UserStatus::Approved).await;

        let err = login(
            State(state),
            Json(login_request("a@example.com", "hunter2-but-longer", Role::Staff)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let state = test_state().await;
        seed(&state, "a@example.com", Role::Staff, UserStatus::Approved).await;

        let err = login(
            State(state),
            Json(login_request("a@example.com", "not-the-password", Role::Staff)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_approved_user_logs_in_without_password_in_response() {
        let state = test_state().await;
        let id = seed(&state, "a@example.com", Role::Student, UserStatus::Approved).await;

        let body = login(
            State(state),
            Json(login_request("a@example.com", "hunter2-but-longer", Role::Student)),
        )
        .await
        .unwrap()
        .0;

        assert!(body["data"]["token"].is_string());
        assert_eq!(body["data"]["user"]["id"], id);
        assert!(body["data"]["user"].get("password").is_none());
    }
}
