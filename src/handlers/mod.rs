// src/handlers/mod.rs

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod papers;
pub mod practice;
pub mod profile;
pub mod subjects;

use sqlx::PgPool;

use crate::{error::AppError, models::user::User, utils::jwt::Claims};

/// Loads the user row behind the claims the auth middleware injected.
pub(crate) async fn load_user(pool: &PgPool, claims: &Claims) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(claims.user_id())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
