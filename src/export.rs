//! CSV rendering for attendance exports.

use axum::{
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};

use crate::{
    error::AppError,
    models::attendance::{Attendance, AttendanceRecord},
};

/// A student's own records: date, meal, marked-at timestamp.
pub fn student_csv(records: &[Attendance]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Date", "Meal Type", "Marked At"])?;

    for record in records {
        writer.write_record([
            record.date.to_string(),
            record.meal_type.to_string(),
            record.marked_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ])?;
    }

    finish(writer)
}

/// The full report with student and marker details.
pub fn report_csv(records: &[AttendanceRecord]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "Student Name",
        "Roll No.",
        "Enrollment No.",
        "Date",
        "Meal Type",
        "Marked At",
        "Marked By",
        "Manual Entry",
        "Notes",
    ])?;

    for record in records {
        writer.write_record([
            record.user_name.clone(),
            record.roll_no.clone().unwrap_or_default(),
            record.enrollment_no.clone().unwrap_or_default(),
            record.date.to_string(),
            record.meal_type.to_string(),
            record.marked_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.marked_by_user_name.clone().unwrap_or_default(),
            if record.is_manual_entry { "Yes" } else { "No" }.to_string(),
            record.notes.clone().unwrap_or_default(),
        ])?;
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, AppError> {
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Export(e.into_error().into()))?;
    String::from_utf8(bytes)
        .map_err(|_| AppError::Validation("Export produced invalid UTF-8".to_string()))
}

/// Wraps CSV content as a file-download response.
pub fn csv_response(filename: &str, body: String) -> Response {
    (
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meal::MealType;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn sample() -> Attendance {
        Attendance {
            id: 1,
            user_id: 7,
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            meal_type: MealType::Lunch,
            marked_at: Utc.with_ymd_and_hms(2026, 3, 10, 12, 30, 0).unwrap(),
            marked_by_user_id: Some(2),
            is_manual_entry: false,
            notes: None,
        }
    }

    #[test]
    fn test_student_csv_layout() {
        let csv = student_csv(&[sample()]).unwrap();
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some("Date,Meal Type,Marked At"));
        assert_eq!(lines.next(), Some("2026-03-10,lunch,2026-03-10 12:30:00"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_empty_report_has_header_only() {
        let csv = report_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.starts_with("Student Name,"));
    }

    #[test]
    fn test_report_csv_escapes_commas() {
        let record = AttendanceRecord {
            id: 1,
            user_id: 7,
            user_name: "Singh, Asha".to_string(),
            roll_no: Some("R-12".to_string()),
            enrollment_no: None,
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            meal_type: MealType::Dinner,
            marked_at: Utc.with_ymd_and_hms(2026, 3, 10, 19, 5, 0).unwrap(),
            marked_by_user_name: Some("Warden".to_string()),
            ip_address: None,
            device_info: None,
            is_manual_entry: true,
            notes: Some("late entry".to_string()),
        };

        let csv = report_csv(&[record]).unwrap();
        assert!(csv.contains("\"Singh, Asha\""));
        assert!(csv.contains("Yes"));
    }
}
