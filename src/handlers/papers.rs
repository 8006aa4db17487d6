// src/handlers/papers.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{error::AppError, models::paper::Paper};

/// Lists mock-exam papers, newest first.
pub async fn list_papers(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let papers =
        sqlx::query_as::<_, Paper>("SELECT * FROM papers ORDER BY created_at DESC LIMIT 100")
            .fetch_all(&pool)
            .await?;

    Ok(Json(papers))
}

/// Fetches one paper by id.
pub async fn get_paper(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let paper = sqlx::query_as::<_, Paper>("SELECT * FROM papers WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Paper not found".to_string()))?;

    Ok(Json(paper))
}
