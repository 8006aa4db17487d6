// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Minimum attempts a question needs before its difficulty rating is
/// recomputed from its wrong-answer rate.
pub const DIFFICULTY_MIN_ATTEMPTS: i64 = 10;

/// A selected subject may not be removed within this window of being added,
/// unless the user has premium access.
pub const SUBJECT_REMOVAL_COOLDOWN_DAYS: i64 = 60;

/// Signup verification codes expire after this many minutes.
pub const VERIFICATION_CODE_TTL_MINUTES: i64 = 15;

/// Rating assigned before any attempts exist (also the default percentile).
pub const NEUTRAL_RATING: f64 = 50.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Daily attempt cap for non-premium users.
    pub free_daily_attempt_limit: i64,
    /// Max selected subjects for non-premium users.
    pub free_subject_limit: i64,
    /// Half-width R of the difficulty band around a user's percentile.
    pub difficulty_tolerance: f64,

    pub subject_catalog_path: String,

    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86400);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let free_daily_attempt_limit = env::var("FREE_DAILY_ATTEMPT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let free_subject_limit = env::var("FREE_SUBJECT_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);

        let difficulty_tolerance = env::var("DIFFICULTY_TOLERANCE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10.0);

        let subject_catalog_path =
            env::var("SUBJECT_CATALOG_PATH").unwrap_or_else(|_| "subjects.json".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            free_daily_attempt_limit,
            free_subject_limit,
            difficulty_tolerance,
            subject_catalog_path,
            admin_username,
            admin_password,
        }
    }
}
