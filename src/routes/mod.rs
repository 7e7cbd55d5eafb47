use std::sync::Arc;

use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod staff;
pub mod student;

use crate::meal::active_meal_now;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/general/active-meal", get(active_meal))
        .nest("/api/auth", auth::router())
        .nest("/api/student", student::router())
        .nest("/api/staff", staff::router())
        .nest("/api/admin", admin::router())
}

/// Standard success envelope.
pub(crate) fn ok<T: Serialize>(data: T) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub(crate) fn ok_message<T: Serialize>(data: T, message: &str) -> Json<Value> {
    Json(json!({ "success": true, "data": data, "message": message }))
}

/// Common query shape for export endpoints.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExportQuery {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    #[serde(default = "default_format")]
    pub format: String,
}

pub(crate) fn default_format() -> String {
    "csv".to_string()
}

async fn active_meal() -> Json<Value> {
    ok(json!({ "mealType": active_meal_now() }))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use jsonwebtoken::{DecodingKey, EncodingKey};

    use crate::{config::Config, db::test_pool, state::AppState};

    /// State over an in-memory database, for exercising handlers directly.
    pub async fn test_state() -> Arc<AppState> {
        let secret = b"test-secret";

        Arc::new(AppState {
            config: Config {
                port: 0,
                database_url: "sqlite::memory:".to_string(),
                frontend_url: None,
                jwt_secret: "test-secret".to_string(),
                token_expiry_hours: 1,
                qr_expiry_minutes: 5,
            },
            pool: test_pool().await,
            jwt_encoding: EncodingKey::from_secret(secret),
            jwt_decoding: DecodingKey::from_secret(secret),
        })
    }
}
