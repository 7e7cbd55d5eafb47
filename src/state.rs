use std::sync::Arc;

use jsonwebtoken::{DecodingKey, EncodingKey};
use sqlx::SqlitePool;

use super::{config::Config, db::init_db};

pub struct AppState {
    pub config: Config,
    pub pool: SqlitePool,
    pub jwt_encoding: EncodingKey,
    pub jwt_decoding: DecodingKey,
}

impl AppState {
    pub async fn new() -> Arc<Self> {
        let config = Config::load();

        let pool = init_db(&config.database_url)
            .await
            .expect("Database misconfigured!");

        let jwt_encoding = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let jwt_decoding = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Arc::new(Self {
            config,
            pool,
            jwt_encoding,
            jwt_decoding,
        })
    }
}
