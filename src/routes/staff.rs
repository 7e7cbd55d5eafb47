use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, StatusCode, header::USER_AGENT},
    response::Response,
    routing::{get, post},
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tracing::info;

use crate::{
    auth::Staff,
    error::{AppError, conflict_on_unique},
    export,
    meal::MealType,
    models::{
        activity::log_activity,
        attendance::{self, NewAttendance, ReportFilter, month_bounds, week_bounds},
        user,
    },
    qr,
    state::AppState,
};

use super::{ExportQuery, ok, ok_message};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/attendance/mark-qr", post(mark_attendance_by_qr))
        .route("/attendance", get(attendance_records))
        .route("/attendance/summary", get(attendance_summary))
        .route("/attendance/export", get(export_attendance))
        .route("/dashboard/summary", get(attendance_summary))
        .route("/dashboard/recent-attendance", get(recent_attendance))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MarkQrRequest {
    qr_token: String,
    meal_type: MealType,
}

/// Verifies a scanned QR token and records the meal. The token must match
/// the scanner's selected meal and today's date; the unique index catches
/// any double check-in that slips past the pre-check.
async fn mark_attendance_by_qr(
    State(state): State<Arc<AppState>>,
    Staff(caller): Staff,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(req): Json<MarkQrRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let claims = qr::verify(&state.jwt_decoding, &req.qr_token)?;

    if claims.meal != req.meal_type {
        return Err(AppError::Validation(
            "The meal type in the QR code does not match the selected meal type.".to_string(),
        ));
    }

    let today = Local::now().date_naive();
    if claims.date != today {
        return Err(AppError::Validation(
            "The QR code is not valid for today.".to_string(),
        ));
    }

    let already = attendance::meals_marked_on(&state.pool, claims.sub, today).await?;
    if already.contains(&req.meal_type) {
        return Err(AppError::Conflict(format!(
            "Attendance for {} today is already marked for this student.",
            req.meal_type
        )));
    }

    let device_info = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    let record = NewAttendance {
        user_id: claims.sub,
        date: today,
        meal_type: req.meal_type,
        marked_by_user_id: Some(caller.id),
        ip_address: Some(addr.ip().to_string()),
        device_info,
        is_manual_entry: false,
        notes: None,
    };

    let record_id = attendance::insert(&state.pool, &record).await.map_err(|e| {
        conflict_on_unique(
            e,
            "Attendance for this meal today is already marked for this student.",
        )
    })?;

    info!(
        "Staff {} marked {} for student {} (record {record_id})",
        caller.id, req.meal_type, claims.sub
    );
    log_activity(
        &state.pool,
        "attendance_marked",
        &format!("Student {} marked for {}", claims.sub, req.meal_type),
        Some(record_id),
        Some("attendance"),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        ok_message(json!({ "recordId": record_id }), "Attendance marked successfully"),
    ))
}

#[derive(Deserialize)]
struct RecordsQuery {
    date: Option<NaiveDate>,
    limit: Option<i64>,
}

async fn attendance_records(
    State(state): State<Arc<AppState>>,
    Staff(_): Staff,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<Value>, AppError> {
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());

    let filter = ReportFilter {
        start_date: Some(date),
        end_date: Some(date),
        limit: query.limit,
        ..Default::default()
    };
    let records = attendance::report(&state.pool, &filter).await?;

    Ok(ok(records))
}

/// Today's counts plus longer-range context for the staff dashboard.
pub(crate) async fn summary_payload(pool: &SqlitePool) -> Result<Value, AppError> {
    let today = Local::now().date_naive();
    let (week_start, week_end) = week_bounds(today);
    let (month_start, month_end) = month_bounds(today);

    let day = attendance::day_summary(pool, today).await?;
    let approved_students = user::count_approved_students(pool).await?;
    let week_meals = attendance::count_between(pool, week_start, week_end).await?;
    let month_meals = attendance::count_between(pool, month_start, month_end).await?;

    Ok(json!({
        "date": today,
        "totalMealsMarkedToday": day.total_meals,
        "distinctStudentsMarkedToday": day.distinct_students,
        "todayBreakfastCount": day.breakfast_count,
        "todayLunchCount": day.lunch_count,
        "todayDinnerCount": day.dinner_count,
        "totalApprovedStudents": approved_students,
        "thisWeekAttendedMeals": week_meals,
        "thisMonthAttendedMeals": month_meals,
    }))
}

async fn attendance_summary(
    State(state): State<Arc<AppState>>,
    Staff(_): Staff,
) -> Result<Json<Value>, AppError> {
    Ok(ok(summary_payload(&state.pool).await?))
}

async fn export_attendance(
    State(state): State<Arc<AppState>>,
    Staff(_): Staff,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    if query.format != "csv" {
        return Err(AppError::Validation(
            "Unsupported export format. Only csv is available.".to_string(),
        ));
    }

    let filter = ReportFilter {
        start_date: Some(query.start_date),
        end_date: Some(query.end_date),
        ..Default::default()
    };
    let records = attendance::report(&state.pool, &filter).await?;
    let body = export::report_csv(&records)?;

    Ok(export::csv_response("attendance-report.csv", body))
}

async fn recent_attendance(
    State(state): State<Arc<AppState>>,
    Staff(_): Staff,
) -> Result<Json<Value>, AppError> {
    let today = Local::now().date_naive();

    let filter = ReportFilter {
        start_date: Some(today),
        end_date: Some(today),
        limit: Some(5),
        ..Default::default()
    };
    let records = attendance::report(&state.pool, &filter).await?;

    Ok(ok(records))
}
