//! Signed QR meal tokens.
//!
//! A student's QR code carries a short-lived HS256 token binding the student,
//! the date, and the meal type. Staff scanners post it back for verification;
//! nothing about the token is stored server-side.

use chrono::{Duration, NaiveDate, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, meal::MealType};

#[derive(Debug, Serialize, Deserialize)]
pub struct QrClaims {
    /// Student user id.
    pub sub: i64,
    pub date: NaiveDate,
    pub meal: MealType,
    pub exp: i64,
}

pub fn issue(
    key: &EncodingKey,
    user_id: i64,
    date: NaiveDate,
    meal: MealType,
    expiry_minutes: i64,
) -> Result<String, AppError> {
    let claims = QrClaims {
        sub: user_id,
        date,
        meal,
        exp: (Utc::now() + Duration::minutes(expiry_minutes)).timestamp(),
    };

    encode(&Header::default(), &claims, key).map_err(AppError::Token)
}

pub fn verify(key: &DecodingKey, token: &str) -> Result<QrClaims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let data = decode::<QrClaims>(token, key, &validation).map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::QrExpired,
        _ => AppError::QrInvalid,
    })?;

    Ok(data.claims)
}
