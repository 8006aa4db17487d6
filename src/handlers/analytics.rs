// src/handlers/analytics.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::AppError;

/// Aggregated row joined from `users` and `user_subjects`.
#[derive(Debug, Serialize, FromRow)]
pub struct LeaderboardEntry {
    pub username: String,
    pub rating: f64,
    pub attempts: i64,
    pub percentile: f64,
}

/// Retrieves the top 10 ratings for a subject.
pub async fn get_leaderboard(
    State(pool): State<PgPool>,
    Path(subject_code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let leaderboard = sqlx::query_as::<_, LeaderboardEntry>(
        r#"
        SELECT u.username, s.rating, s.attempts, s.percentile
        FROM user_subjects s
        JOIN users u ON s.user_id = u.id
        WHERE s.subject_code = $1
        ORDER BY s.rating DESC, s.attempts DESC
        LIMIT 10
        "#,
    )
    .bind(&subject_code)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to fetch leaderboard: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(leaderboard))
}
