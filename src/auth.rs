//! Bearer-token authentication and role gating.
//!
//! Login issues an HS256 token carrying the user id and role; handlers pull
//! the caller out of the `Authorization` header through the extractors below.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::user::Role, state::AppState};

const BCRYPT_COST: u32 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: i64,
    pub role: Role,
    pub exp: i64,
}

pub fn issue_token(
    key: &EncodingKey,
    user_id: i64,
    role: Role,
    expiry_hours: i64,
) -> Result<String, AppError> {
    let claims = AuthClaims {
        sub: user_id,
        role,
        exp: (Utc::now() + Duration::hours(expiry_hours)).timestamp(),
    };

    encode(&Header::default(), &claims, key).map_err(AppError::Token)
}

pub fn verify_token(key: &DecodingKey, token: &str) -> Result<AuthClaims, AppError> {
    decode::<AuthClaims>(token, key, &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(|_| AppError::Forbidden("Invalid or expired token."))
}

pub fn hash_password(raw: &str) -> Result<String, AppError> {
    Ok(bcrypt::hash(raw, BCRYPT_COST)?)
}

pub fn verify_password(raw: &str, hash: &str) -> Result<bool, AppError> {
    Ok(bcrypt::verify(raw, hash)?)
}

/// The authenticated caller, extracted from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
    pub role: Role,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthorized("Authentication token required."))?;

        let claims = verify_token(&state.jwt_decoding, token)?;

        Ok(AuthUser {
            id: claims.sub,
            role: claims.role,
        })
    }
}

const FORBIDDEN: AppError =
    AppError::Forbidden("You do not have permission to access this resource.");

/// Caller with the `student` role.
pub struct Student(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Student {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Student => Ok(Student(user)),
            _ => Err(FORBIDDEN),
        }
    }
}

/// Caller with the `staff` or `admin` role.
pub struct Staff(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Staff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Staff | Role::Admin => Ok(Staff(user)),
            Role::Student => Err(FORBIDDEN),
        }
    }
}

/// Caller with the `admin` role.
pub struct Admin(pub AuthUser);

impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Admin => Ok(Admin(user)),
            _ => Err(FORBIDDEN),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("hunter2-but-longer").unwrap();
        assert!(verify_password("hunter2-but-longer", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_token_roundtrip() {
        let enc = EncodingKey::from_secret(b"test-secret");
        let dec = DecodingKey::from_secret(b"test-secret");

        let token = issue_token(&enc, 7, Role::Staff, 1).unwrap();
        let claims = verify_token(&dec, &token).unwrap();

        assert_eq!(claims.sub, 7);
        assert_eq!(claims.role, Role::Staff);
    }

    #[test]
    fn test_token_wrong_secret() {
        let enc = EncodingKey::from_secret(b"test-secret");
        let dec = DecodingKey::from_secret(b"another-secret");

        let token = issue_token(&enc, 7, Role::Admin, 1).unwrap();
        assert!(verify_token(&dec, &token).is_err());
    }
}
