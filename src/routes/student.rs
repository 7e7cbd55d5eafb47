use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::{
    auth::Student,
    error::AppError,
    export,
    meal::{MealType, active_meal_now},
    models::{
        attendance::{self, days_in_month, month_bounds, week_bounds},
        mess_plan::{self, has_conflict},
        notification,
        student::{self, StudentFields},
        user,
    },
    qr,
    state::AppState,
};

use super::{ExportQuery, ok, ok_message};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/mess-plans", get(get_mess_plans).post(create_mess_plan))
        .route("/mess-plan/active", get(active_mess_plan))
        .route("/generate-qr", post(generate_qr))
        .route("/attendance", get(attendance_for_day))
        .route("/attendance/range", get(attendance_range))
        .route("/attendance/summary", get(attendance_summary))
        .route("/attendance/export", get(export_attendance))
        .route("/notifications/recent", get(recent_notifications))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
) -> Result<Json<Value>, AppError> {
    let profile = user::load_profile(&state.pool, caller.id)
        .await?
        .ok_or(AppError::NotFound("Student profile"))?;

    Ok(ok(profile))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    name: Option<String>,
    phone: Option<String>,
    course: Option<String>,
    year: Option<String>,
    branch: Option<String>,
}

/// Roll and enrollment numbers identify the student and are kept as-is;
/// only the contact and course fields are editable here.
async fn update_profile(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    if let Some(name) = &req.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
    }

    let existing = student::find_by_user_id(&state.pool, caller.id)
        .await?
        .ok_or(AppError::NotFound("Student profile"))?;

    let fields = StudentFields {
        roll_no: existing.roll_no,
        enrollment_no: existing.enrollment_no,
        branch: req.branch.or(existing.branch),
        year: req.year.or(existing.year),
        phone: req.phone.or(existing.phone),
        course: req.course.or(existing.course),
    };
    student::update_by_user_id(&state.pool, caller.id, &fields).await?;

    if let Some(name) = &req.name {
        user::update_name(&state.pool, caller.id, name.trim()).await?;
    }

    let profile = user::load_profile(&state.pool, caller.id)
        .await?
        .ok_or(AppError::NotFound("Student profile"))?;

    Ok(ok(profile))
}

async fn get_mess_plans(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
) -> Result<Json<Value>, AppError> {
    let plans = mess_plan::find_by_user(&state.pool, caller.id).await?;
    Ok(ok(plans))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlanRequest {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

async fn create_mess_plan(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
    Json(req): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let today = Local::now().date_naive();

    if req.end_date < req.start_date {
        return Err(AppError::Validation("End date cannot be before start date.".to_string()));
    }
    if req.start_date < today {
        return Err(AppError::Validation("Start date cannot be in the past.".to_string()));
    }

    let existing = mess_plan::find_by_user(&state.pool, caller.id).await?;
    if has_conflict(&existing, req.start_date, req.end_date) {
        return Err(AppError::Conflict(
            "You have an overlapping active or pending mess plan request. Make sure the new plan \
             starts after your current plan ends."
                .to_string(),
        ));
    }

    let plan_id = mess_plan::create(&state.pool, caller.id, req.start_date, req.end_date).await?;
    let plan = mess_plan::find_by_id(&state.pool, plan_id)
        .await?
        .ok_or(AppError::NotFound("Mess plan"))?;

    info!("Student {} requested mess plan {plan_id}", caller.id);

    Ok((
        StatusCode::CREATED,
        ok_message(plan, "Mess plan request submitted for approval."),
    ))
}

async fn active_mess_plan(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
) -> Result<Json<Value>, AppError> {
    let today = Local::now().date_naive();
    let plan = mess_plan::active_for(&state.pool, caller.id, today).await?;
    Ok(ok(plan))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateQrRequest {
    date: NaiveDate,
    meal_type: MealType,
}

/// Issues the signed QR token after checking the full set of gates: plan
/// coverage, not-yet-marked, and the live meal window.
async fn generate_qr(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
    Json(req): Json<GenerateQrRequest>,
) -> Result<Json<Value>, AppError> {
    let plan = mess_plan::active_for(&state.pool, caller.id, req.date).await?;
    if plan.is_none() {
        return Err(AppError::Validation(
            "You do not have an active mess plan covering this date.".to_string(),
        ));
    }

    let today = Local::now().date_naive();
    let marked = attendance::meals_marked_on(&state.pool, caller.id, today).await?;
    if marked.contains(&req.meal_type) {
        return Err(AppError::Conflict(format!(
            "You have already checked in for {} today.",
            req.meal_type
        )));
    }

    if active_meal_now() != Some(req.meal_type) {
        return Err(AppError::Validation(format!(
            "It's not the active time for {}. Try again during the meal window.",
            req.meal_type
        )));
    }

    let token = qr::issue(
        &state.jwt_encoding,
        caller.id,
        req.date,
        req.meal_type,
        state.config.qr_expiry_minutes,
    )?;

    Ok(ok(json!({ "qrData": token })))
}

#[derive(Deserialize)]
struct DayQuery {
    date: NaiveDate,
}

async fn attendance_for_day(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    let records =
        attendance::for_student_range(&state.pool, caller.id, query.date, query.date).await?;
    Ok(ok(records))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

async fn attendance_range(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Value>, AppError> {
    if query.end_date < query.start_date {
        return Err(AppError::Validation("End date cannot be before start date.".to_string()));
    }

    let records =
        attendance::for_student_range(&state.pool, caller.id, query.start_date, query.end_date)
            .await?;
    Ok(ok(records))
}

async fn attendance_summary(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
) -> Result<Json<Value>, AppError> {
    let today = Local::now().date_naive();
    let (week_start, week_end) = week_bounds(today);
    let (month_start, month_end) = month_bounds(today);

    let today_meals =
        attendance::for_student_range(&state.pool, caller.id, today, today).await?.len();
    let week_meals = attendance::for_student_range(&state.pool, caller.id, week_start, week_end)
        .await?
        .len();
    let month_meals =
        attendance::for_student_range(&state.pool, caller.id, month_start, month_end)
            .await?
            .len();

    Ok(ok(json!({
        "todayAttendedMeals": today_meals,
        "todayTotalPossibleMeals": 3,
        "thisWeekAttendedMeals": week_meals,
        "thisWeekTotalPossibleMeals": 7 * 3,
        "thisMonthAttendedMeals": month_meals,
        "thisMonthTotalPossibleMeals": days_in_month(today) * 3,
    })))
}

async fn export_attendance(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    if query.format != "csv" {
        return Err(AppError::Validation(
            "Unsupported export format. Only csv is available.".to_string(),
        ));
    }

    let records =
        attendance::for_student_range(&state.pool, caller.id, query.start_date, query.end_date)
            .await?;
    let body = export::student_csv(&records)?;

    Ok(export::csv_response("attendance.csv", body))
}

async fn recent_notifications(
    State(state): State<Arc<AppState>>,
    Student(caller): Student,
) -> Result<Json<Value>, AppError> {
    let notifications = notification::recent_for(&state.pool, caller.id, 5).await?;
    Ok(ok(notifications))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::AuthUser,
        models::user::{Role, UserStatus},
        routes::testing::test_state,
    };

    #[tokio::test]
    async fn test_empty_name_rejected_before_any_write() {
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
        let fields = StudentFields {
            phone: Some("1112223334".to_string()),
            ..Default::default()
        };
        student::create(&state.pool, user_id, &fields).await.unwrap();

        let caller = Student(AuthUser {
            id: user_id,
            role: Role::Student,
        });
        let err = update_profile(
            State(state.clone()),
            caller,
            Json(UpdateProfileRequest {
                name: Some("   ".to_string()),
                phone: Some("9998887776".to_string()),
                course: None,
                year: None,
                branch: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // the rejected request must not have touched the student row
        let row = student::find_by_user_id(&state.pool, user_id).await.unwrap().unwrap();
        assert_eq!(row.phone.as_deref(), Some("1112223334"));
    }
}
