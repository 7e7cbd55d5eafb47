use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, put},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::{self, Admin},
    error::{AppError, conflict_on_unique},
    export,
    meal::MealType,
    models::{
        activity::log_activity,
        attendance::{self, ReportFilter},
        mess_plan::{self, PlanStatus},
        notification,
        staff::{self, StaffFields},
        student::{self, StudentFields},
        user::{self, Role, UserStatus},
    },
    state::AppState,
};

use super::{ok, ok_message};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard-stats", get(dashboard_stats))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/mess-plans", get(list_mess_plans))
        .route("/mess-plans/{id}/approve", put(approve_mess_plan))
        .route("/mess-plans/{id}/reject", put(reject_mess_plan))
        .route("/attendance", get(attendance_report))
        .route("/attendance/summary", get(attendance_summary))
        .route("/attendance/export", get(export_attendance))
        .route("/students/approved", get(approved_students))
}

async fn dashboard_stats(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> Result<Json<Value>, AppError> {
    let total_students = user::count_by_role(&state.pool, Role::Student).await?;
    let total_staff = user::count_by_role(&state.pool, Role::Staff).await?;
    let active_plans = mess_plan::count_by_status(&state.pool, PlanStatus::Approved).await?;
    let pending_plans = mess_plan::pending_with_student(&state.pool, 5).await?;

    Ok(ok(json!({
        "totalStudents": total_students,
        "totalStaff": total_staff,
        "activeMessPlans": active_plans,
        "pendingMessPlans": pending_plans,
    })))
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> Result<Json<Value>, AppError> {
    let users = user::find_all(&state.pool).await?;

    let mut profiles = Vec::with_capacity(users.len());
    for account in users {
        profiles.push(user::assemble_profile(&state.pool, account).await?);
    }

    Ok(ok(profiles))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let profile = user::load_profile(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(ok(profile))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateUserRequest {
    name: String,
    email: String,
    password: String,
    role: Role,
    status: Option<UserStatus>,
    student: Option<StudentFields>,
    staff: Option<StaffFields>,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Admin(caller): Admin,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() {
        return Err(AppError::Validation("Name and email are required".to_string()));
    }
    if req.password.len() < 6 {
        return Err(AppError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let email = req.email.trim().to_lowercase();
    if user::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    let details_missing = AppError::Validation(
        "Role-specific details are required for this role.".to_string(),
    );
    match req.role {
        Role::Student if req.student.is_none() => return Err(details_missing),
        Role::Staff if req.staff.is_none() => return Err(details_missing),
        Role::Admin => return Err(details_missing),
        _ => {}
    }

    let password_hash = auth::hash_password(&req.password)?;
    let status = req.status.unwrap_or(UserStatus::Pending);

    let user_id = user::create(&state.pool, req.name.trim(), &email, &password_hash, req.role, status)
        .await?;

    match req.role {
        Role::Student => {
            let fields = req.student.unwrap_or_default();
            student::create(&state.pool, user_id, &fields)
                .await
                .map_err(|e| conflict_on_unique(e, "Roll or enrollment number already registered"))?;
        }
        Role::Staff => {
            let fields = req.staff.unwrap_or_default();
            staff::create(&state.pool, user_id, &fields).await?;
        }
        Role::Admin => {}
    }

    info!("Admin {} created {} user {user_id}", caller.id, req.role);
    log_activity(
        &state.pool,
        "user_created",
        &format!("Created {} account for {}", req.role, email),
        Some(user_id),
        Some("user"),
    )
    .await;

    Ok((StatusCode::CREATED, ok(json!({ "userId": user_id }))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUserRequest {
    name: Option<String>,
    email: Option<String>,
    role: Option<Role>,
    status: Option<UserStatus>,
    new_password: Option<String>,
    student: Option<StudentFields>,
    staff: Option<StaffFields>,
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    Admin(caller): Admin,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    let current = user::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let email = req
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_else(|| current.email.clone());
    if email != current.email {
        if let Some(other) = user::find_by_email(&state.pool, &email).await? {
            if other.id != id {
                return Err(AppError::Conflict(
                    "Email already taken by another user.".to_string(),
                ));
            }
        }
    }

    let name = req.name.as_deref().unwrap_or(&current.name).trim().to_string();
    let role = req.role.unwrap_or(current.role);
    let status = req.status.unwrap_or(current.status);

    user::update(&state.pool, id, &name, &email, role, status).await?;

    if let Some(password) = &req.new_password {
        if password.len() < 6 {
            return Err(AppError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }
        let hash = auth::hash_password(password)?;
        user::update_password(&state.pool, id, &hash).await?;
    }

    match role {
        Role::Student => {
            if let Some(incoming) = req.student {
                let existing = student::find_by_user_id(&state.pool, id).await?;
                let merged = merge_student_fields(incoming, existing);
                student::update_by_user_id(&state.pool, id, &merged).await?;
            }
        }
        Role::Staff => {
            if let Some(incoming) = req.staff {
                let existing = staff::find_by_user_id(&state.pool, id).await?;
                let merged = merge_staff_fields(incoming, existing);
                staff::update_by_user_id(&state.pool, id, &merged).await?;
            }
        }
        Role::Admin => {}
    }

    if status != current.status {
        let message = match status {
            UserStatus::Approved => "Your account has been approved. You can now log in.",
            UserStatus::Suspended => "Your account has been suspended. Contact the mess office.",
            UserStatus::Pending => "Your account has been moved back to pending review.",
        };
        notification::notify(&state.pool, id, "account", message).await?;

        info!("Admin {} changed status of user {id} to {status}", caller.id);
        log_activity(
            &state.pool,
            "user_status_changed",
            &format!("User {id} status changed to {status}"),
            Some(id),
            Some("user"),
        )
        .await;
    }

    let profile = user::load_profile(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(ok(profile))
}

fn merge_student_fields(
    incoming: StudentFields,
    existing: Option<crate::models::student::Student>,
) -> StudentFields {
    let Some(existing) = existing else {
        return incoming;
    };

    StudentFields {
        roll_no: incoming.roll_no.or(existing.roll_no),
        enrollment_no: incoming.enrollment_no.or(existing.enrollment_no),
        branch: incoming.branch.or(existing.branch),
        year: incoming.year.or(existing.year),
        phone: incoming.phone.or(existing.phone),
        course: incoming.course.or(existing.course),
    }
}

fn merge_staff_fields(
    incoming: StaffFields,
    existing: Option<crate::models::staff::StaffMember>,
) -> StaffFields {
    let Some(existing) = existing else {
        return incoming;
    };

    StaffFields {
        employee_id: incoming.employee_id.or(existing.employee_id),
        position: incoming.position.or(existing.position),
        phone: incoming.phone.or(existing.phone),
    }
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Admin(caller): Admin,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    if !user::delete(&state.pool, id).await? {
        return Err(AppError::NotFound("User"));
    }

    info!("Admin {} deleted user {id}", caller.id);
    log_activity(
        &state.pool,
        "user_deleted",
        &format!("User {id} deleted"),
        Some(id),
        Some("user"),
    )
    .await;

    Ok(ok_message(json!(null), "User deleted."))
}

async fn list_mess_plans(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> Result<Json<Value>, AppError> {
    let plans = mess_plan::all_with_student(&state.pool).await?;
    Ok(ok(plans))
}

async fn approve_mess_plan(
    State(state): State<Arc<AppState>>,
    Admin(caller): Admin,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let plan = mess_plan::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("Mess plan"))?;
    if plan.status != PlanStatus::Pending {
        return Err(AppError::Conflict("Only pending mess plans can be approved.".to_string()));
    }

    mess_plan::update_status(&state.pool, id, PlanStatus::Approved, None).await?;

    notification::notify(
        &state.pool,
        plan.user_id,
        "mess_plan",
        &format!(
            "Your mess plan from {} to {} has been approved.",
            plan.start_date, plan.end_date
        ),
    )
    .await?;

    info!("Admin {} approved mess plan {id}", caller.id);
    log_activity(
        &state.pool,
        "mess_plan_approved",
        &format!("Mess plan {id} approved"),
        Some(id),
        Some("mess_plan"),
    )
    .await;

    let updated = mess_plan::find_by_id_with_student(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("Mess plan"))?;
    Ok(ok(updated))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RejectRequest {
    rejection_reason: String,
}

async fn reject_mess_plan(
    State(state): State<Arc<AppState>>,
    Admin(caller): Admin,
    Path(id): Path<i64>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<Value>, AppError> {
    let reason = req.rejection_reason.trim();
    if reason.is_empty() {
        return Err(AppError::Validation("Rejection reason is required.".to_string()));
    }

    let plan = mess_plan::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("Mess plan"))?;
    if plan.status != PlanStatus::Pending {
        return Err(AppError::Conflict("Only pending mess plans can be rejected.".to_string()));
    }

    mess_plan::update_status(&state.pool, id, PlanStatus::Rejected, Some(reason)).await?;

    notification::notify(
        &state.pool,
        plan.user_id,
        "mess_plan",
        &format!(
            "Your mess plan from {} to {} was rejected: {reason}",
            plan.start_date, plan.end_date
        ),
    )
    .await?;

    info!("Admin {} rejected mess plan {id}", caller.id);
    log_activity(
        &state.pool,
        "mess_plan_rejected",
        &format!("Mess plan {id} rejected"),
        Some(id),
        Some("mess_plan"),
    )
    .await;

    let updated = mess_plan::find_by_id_with_student(&state.pool, id)
        .await?
        .ok_or(AppError::NotFound("Mess plan"))?;
    Ok(ok(updated))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    meal_type: Option<MealType>,
    user_id: Option<i64>,
    roll_no: Option<String>,
    enrollment_no: Option<String>,
    is_manual_entry: Option<bool>,
    limit: Option<i64>,
}

impl From<ReportQuery> for ReportFilter {
    fn from(q: ReportQuery) -> Self {
        ReportFilter {
            start_date: q.start_date,
            end_date: q.end_date,
            meal_type: q.meal_type,
            user_id: q.user_id,
            roll_no: q.roll_no,
            enrollment_no: q.enrollment_no,
            is_manual_entry: q.is_manual_entry,
            limit: q.limit,
        }
    }
}

async fn attendance_report(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>, AppError> {
    let records = attendance::report(&state.pool, &query.into()).await?;
    Ok(ok(records))
}

async fn attendance_summary(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> Result<Json<Value>, AppError> {
    Ok(ok(super::staff::summary_payload(&state.pool).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdminExportQuery {
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    #[serde(default = "super::default_format")]
    format: String,
    meal_type: Option<MealType>,
    user_id: Option<i64>,
    roll_no: Option<String>,
    enrollment_no: Option<String>,
    is_manual_entry: Option<bool>,
}

async fn export_attendance(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
    Query(query): Query<AdminExportQuery>,
) -> Result<Response, AppError> {
    if query.format != "csv" {
        return Err(AppError::Validation(
            "Unsupported export format. Only csv is available.".to_string(),
        ));
    }

    let filter = ReportFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        meal_type: query.meal_type,
        user_id: query.user_id,
        roll_no: query.roll_no,
        enrollment_no: query.enrollment_no,
        is_manual_entry: query.is_manual_entry,
        limit: None,
    };
    let records = attendance::report(&state.pool, &filter).await?;
    let body = export::report_csv(&records)?;

    Ok(export::csv_response("attendance-report.csv", body))
}

async fn approved_students(
    State(state): State<Arc<AppState>>,
    Admin(_): Admin,
) -> Result<Json<Value>, AppError> {
    let students = student::all_approved(&state.pool).await?;
    Ok(ok(students))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::CONTENT_TYPE;
    use chrono::Local;

    use crate::{
        auth::AuthUser,
        models::attendance::NewAttendance,
        routes::testing::test_state,
    };

    fn admin() -> Admin {
        Admin(AuthUser {
            id: 999,
            role: Role::Admin,
        })
    }

    #[tokio::test]
    async fn test_export_without_date_range_covers_everything() {
        let state = test_state().await;

        let user_id = user::create(
            &state.pool,
            "Asha",
            "a@example.com",
            "h",
            Role::Student,
            UserStatus::Approved,
        )
        .await
        .unwrap();
        attendance::insert(
            &state.pool,
            &NewAttendance {
                user_id,
                date: Local::now().date_naive(),
                meal_type: MealType::Lunch,
                marked_by_user_id: None,
                ip_address: None,
                device_info: None,
                is_manual_entry: false,
                notes: None,
            },
        )
        .await
        .unwrap();

        let response = export_attendance(
            State(state),
            admin(),
            Query(AdminExportQuery {
                start_date: None,
                end_date: None,
                format: "csv".to_string(),
                meal_type: None,
                user_id: None,
                roll_no: None,
                enrollment_no: None,
                is_manual_entry: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers().get(CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/csv"));
    }
}
