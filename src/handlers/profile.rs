// src/handlers/profile.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::Serialize;

use crate::{
    core::quota::attempts_today,
    error::AppError,
    handlers::load_user,
    models::{
        attempt::{Attempt, HistoryParams},
        subject::UserSubject,
        user::MeResponse,
    },
    state::AppState,
    utils::jwt::Claims,
};

/// Get current user's profile: identity, access flags, cumulative stats,
/// and the selected-subjects list.
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state.pool, &claims).await?;

    let selected_subjects = sqlx::query_as::<_, UserSubject>(
        "SELECT * FROM user_subjects WHERE user_id = $1 ORDER BY date_added",
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        role: user.role,
        is_verified: user.is_verified,
        premium_valid: user.premium_valid,
        premium_plan: user.premium_plan,
        premium_till: user.premium_till,
        grader_valid: user.grader_valid,
        grader_till: user.grader_till,
        cumulative_rating: user.cumulative_rating,
        cumulative_percentile: user.cumulative_percentile,
        selected_subjects,
        created_at: user.created_at,
    }))
}

/// Lists the user's attempt history, newest first.
pub async fn get_history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<HistoryParams>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 200);

    let history = sqlx::query_as::<_, Attempt>(
        "SELECT * FROM attempts WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
    )
    .bind(claims.user_id())
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(history))
}

/// Aggregated practice stats for dashboard clients.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub subjects: Vec<UserSubject>,
    pub attempts_today: i64,
    pub daily_limit: i64,
    pub premium: bool,
    pub week_attempts: i64,
    pub week_correct: i64,
    pub week_accuracy: f64,
    pub cumulative_rating: f64,
    pub cumulative_percentile: f64,
}

/// Per-subject ratings plus time-windowed counts over the attempt history.
pub async fn get_stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state.pool, &claims).await?;

    let subjects = sqlx::query_as::<_, UserSubject>(
        "SELECT * FROM user_subjects WHERE user_id = $1 ORDER BY rating DESC",
    )
    .bind(user.id)
    .fetch_all(&state.pool)
    .await?;

    let mut conn = state.pool.acquire().await?;
    let today = attempts_today(&mut *conn, user.id).await?;

    let week_ago = Utc::now() - Duration::days(7);
    let (week_attempts, week_correct): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*)::BIGINT,
               COALESCE(SUM(CASE WHEN is_correct THEN 1 ELSE 0 END), 0)::BIGINT
        FROM attempts
        WHERE user_id = $1 AND created_at >= $2
        "#,
    )
    .bind(user.id)
    .bind(week_ago)
    .fetch_one(&mut *conn)
    .await?;

    let week_accuracy = if week_attempts == 0 {
        0.0
    } else {
        week_correct as f64 / week_attempts as f64 * 100.0
    };

    Ok(Json(StatsResponse {
        subjects,
        attempts_today: today,
        daily_limit: state.config.free_daily_attempt_limit,
        premium: user.premium_valid,
        week_attempts,
        week_correct,
        week_accuracy,
        cumulative_rating: user.cumulative_rating,
        cumulative_percentile: user.cumulative_percentile,
    }))
}
