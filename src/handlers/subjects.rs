// src/handlers/subjects.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use validator::Validate;

use crate::{
    config::SUBJECT_REMOVAL_COOLDOWN_DAYS,
    core::quota::{check_subject_capacity, selected_subject_count},
    error::AppError,
    handlers::load_user,
    models::subject::{AddSubjectRequest, UserSubject},
    state::AppState,
    utils::jwt::Claims,
};

/// Lists the subject catalog (reference data).
pub async fn list_catalog(State(state): State<AppState>) -> impl IntoResponse {
    Json((*state.catalog).clone())
}

/// Lists the current user's selected subjects with their rolling stats.
pub async fn list_selected(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let subjects = sqlx::query_as::<_, UserSubject>(
        "SELECT * FROM user_subjects WHERE user_id = $1 ORDER BY date_added",
    )
    .bind(claims.user_id())
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(subjects))
}

/// Adds a subject to the user's practice list.
/// Non-premium users are capped at the free-tier subject limit.
pub async fn add_subject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<AddSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let subject = state.catalog.get(&payload.subject_code).ok_or_else(|| {
        AppError::NotFound(format!("Unknown subject code '{}'", payload.subject_code))
    })?;

    let user = load_user(&state.pool, &claims).await?;

    let mut conn = state.pool.acquire().await?;
    let current = selected_subject_count(&mut *conn, user.id).await?;
    check_subject_capacity(&user, current, state.config.free_subject_limit)?;

    let row = sqlx::query_as::<_, UserSubject>(
        r#"
        INSERT INTO user_subjects (user_id, subject_code, subject_name)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(user.id)
    .bind(&subject.code)
    .bind(&subject.name)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("Subject '{}' already selected", subject.code))
        } else {
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(row)))
}

/// Removes a subject from the user's practice list.
/// Blocked within the cooldown window of being added, unless premium.
/// The attempt history for the subject is kept; it is append-only.
pub async fn remove_subject(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(subject_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state.pool, &claims).await?;

    let row = sqlx::query_as::<_, UserSubject>(
        "SELECT * FROM user_subjects WHERE user_id = $1 AND subject_code = $2",
    )
    .bind(user.id)
    .bind(&subject_code)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Subject '{subject_code}' is not selected")))?;

    if !user.premium_valid {
        let unlocks_at = row.date_added + Duration::days(SUBJECT_REMOVAL_COOLDOWN_DAYS);
        if Utc::now() < unlocks_at {
            return Err(AppError::BadRequest(format!(
                "Subject '{subject_code}' can be removed after {}",
                unlocks_at.format("%Y-%m-%d")
            )));
        }
    }

    sqlx::query("DELETE FROM user_subjects WHERE id = $1")
        .bind(row.id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
