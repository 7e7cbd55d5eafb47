use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub frontend_url: Option<String>,
    pub jwt_secret: String,
    pub token_expiry_hours: i64,
    pub qr_expiry_minutes: i64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("MESS_PORT", "8080"),
            database_url: try_load("DATABASE_URL", "sqlite://mess.db?mode=rwc"),
            frontend_url: var("FRONTEND_URL").ok(),
            jwt_secret: read_secret("JWT_SECRET"),
            token_expiry_hours: try_load("TOKEN_EXPIRY_HOURS", "1"),
            qr_expiry_minutes: try_load("QR_EXPIRY_MINUTES", "5"),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}

/// Reads a Docker-style secret file, falling back to the plain environment
/// variable for local runs.
fn read_secret(secret_name: &str) -> String {
    let path = format!("/run/secrets/{secret_name}");

    if let Ok(s) = read_to_string(&path) {
        return s.trim().to_string();
    }

    var(secret_name)
        .map_err(|_| {
            warn!("Failed to read {secret_name} from file or environment");
        })
        .expect("Secrets misconfigured!")
}
