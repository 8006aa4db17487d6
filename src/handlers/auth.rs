// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, Utc};
use rand::Rng;
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::{Config, VERIFICATION_CODE_TTL_MINUTES},
    error::AppError,
    models::user::{CreateUserRequest, LoginRequest, User, VerifyEmailRequest},
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new, unverified user.
///
/// Hashes the password using Argon2 and issues a time-limited 6-digit
/// verification code. Delivering the code is the email collaborator's job;
/// this service only records and logs its issuance.
pub async fn register(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let hashed_password = hash_password(&payload.password)?;
    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
    let expires_at = Utc::now() + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES);

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password, verification_code, verification_expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&payload.username)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(&code)
    .bind(expires_at)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Username or email already registered".to_string())
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    tracing::info!(user_id = user.id, "Verification code issued");
    tracing::debug!(user_id = user.id, code = %code, "Verification code (dev only)");

    Ok((StatusCode::CREATED, Json(user)))
}

/// Confirms the signup verification code within its TTL.
pub async fn verify_email(
    State(pool): State<PgPool>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&payload.email)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if user.is_verified {
        return Ok(Json(json!({ "message": "Already verified" })));
    }

    let stored_code = user
        .verification_code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("No verification pending".to_string()))?;

    let expired = user
        .verification_expires_at
        .map(|at| Utc::now() > at)
        .unwrap_or(true);
    if expired {
        return Err(AppError::BadRequest("Verification code expired".to_string()));
    }

    if stored_code != payload.code {
        return Err(AppError::BadRequest("Invalid verification code".to_string()));
    }

    sqlx::query(
        "UPDATE users SET is_verified = TRUE, verification_code = NULL, verification_expires_at = NULL WHERE id = $1",
    )
    .bind(user.id)
    .execute(&pool)
    .await?;

    tracing::info!(user_id = user.id, "User verified");

    Ok(Json(json!({ "message": "Verification successful" })))
}

/// Authenticates a user and returns a JWT token.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
        .bind(&payload.username)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    let user = user.ok_or(AppError::AuthError("User not found".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid password".to_string()));
    }

    let token = sign_jwt(&user, &config.jwt_secret, config.jwt_expiration)?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "is_verified": user.is_verified
    })))
}
