// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        paper::CreatePaperRequest,
        question::{CreateQuestionRequest, OPTION_TAGS, is_valid_level},
        user::User,
    },
    state::AppState,
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id DESC")
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list users: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(users))
}

/// Creates a new question in the corpus.
/// Admin only.
pub async fn create_question(
    State(state): State<AppState>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    if !is_valid_level(&payload.level) {
        return Err(AppError::BadRequest(format!(
            "Unknown level '{}'",
            payload.level
        )));
    }
    if !OPTION_TAGS.contains(&payload.correct_option.as_str()) {
        return Err(AppError::BadRequest(
            "correct_option must be one of A-D".to_string(),
        ));
    }
    let subject = state.catalog.get(&payload.subject_code).ok_or_else(|| {
        AppError::BadRequest(format!("Unknown subject code '{}'", payload.subject_code))
    })?;

    let difficulty = payload.difficulty_rating.unwrap_or(50.0);

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO questions
            (subject_code, subject_name, level, topic, subtopic, question_text,
             options, correct_option, explanation, difficulty_rating, source)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'admin')
        RETURNING id
        "#,
    )
    .bind(&subject.code)
    .bind(&subject.name)
    .bind(&payload.level)
    .bind(&payload.topic)
    .bind(&payload.subtopic)
    .bind(&payload.question_text)
    .bind(SqlJson(&payload.options))
    .bind(&payload.correct_option)
    .bind(&payload.explanation)
    .bind(difficulty)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateQuestionRequest {
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    pub question_text: Option<String>,
    pub correct_option: Option<String>,
    pub explanation: Option<String>,
    pub difficulty_rating: Option<f64>,
}

/// Updates a question by ID.
/// Admin only.
pub async fn update_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.topic.is_none()
        && payload.subtopic.is_none()
        && payload.question_text.is_none()
        && payload.correct_option.is_none()
        && payload.explanation.is_none()
        && payload.difficulty_rating.is_none()
    {
        return Ok(StatusCode::OK);
    }

    if let Some(correct_option) = &payload.correct_option {
        if !OPTION_TAGS.contains(&correct_option.as_str()) {
            return Err(AppError::BadRequest(
                "correct_option must be one of A-D".to_string(),
            ));
        }
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(topic) = payload.topic {
        separated.push("topic = ");
        separated.push_bind_unseparated(topic);
    }

    if let Some(subtopic) = payload.subtopic {
        separated.push("subtopic = ");
        separated.push_bind_unseparated(subtopic);
    }

    if let Some(question_text) = payload.question_text {
        separated.push("question_text = ");
        separated.push_bind_unseparated(question_text);
    }

    if let Some(correct_option) = payload.correct_option {
        separated.push("correct_option = ");
        separated.push_bind_unseparated(correct_option);
    }

    if let Some(explanation) = payload.explanation {
        separated.push("explanation = ");
        separated.push_bind_unseparated(explanation);
    }

    if let Some(difficulty_rating) = payload.difficulty_rating {
        separated.push("difficulty_rating = ");
        separated.push_bind_unseparated(difficulty_rating);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a question by ID. Operator tool only; normal operation never
/// removes questions.
/// Admin only.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete question: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a mock-exam paper grouping existing questions.
/// Admin only.
pub async fn create_paper(
    State(pool): State<PgPool>,
    Json(payload): Json<CreatePaperRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let found: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE id = ANY($1)")
        .bind(&payload.question_ids)
        .fetch_one(&pool)
        .await?;
    if found != payload.question_ids.len() as i64 {
        return Err(AppError::BadRequest(
            "One or more question ids do not exist".to_string(),
        ));
    }

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO papers (title, subject_code, question_ids) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&payload.title)
    .bind(&payload.subject_code)
    .bind(SqlJson(&payload.question_ids))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// DTO for granting or revoking access flags on a user.
#[derive(Debug, Deserialize)]
pub struct UpdateAccessRequest {
    pub premium_valid: Option<bool>,
    pub premium_plan: Option<String>,
    pub premium_till: Option<chrono::DateTime<chrono::Utc>>,
    pub grader_valid: Option<bool>,
    pub grader_till: Option<chrono::DateTime<chrono::Utc>>,
    pub grader_weekly_limit: Option<i64>,
}

/// Updates a user's premium/grader access flags.
/// Admin only.
pub async fn update_access(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateAccessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
    let mut separated = builder.separated(", ");
    let mut any = false;

    if let Some(premium_valid) = payload.premium_valid {
        separated.push("premium_valid = ");
        separated.push_bind_unseparated(premium_valid);
        any = true;
    }
    if let Some(premium_plan) = payload.premium_plan {
        separated.push("premium_plan = ");
        separated.push_bind_unseparated(premium_plan);
        any = true;
    }
    if let Some(premium_till) = payload.premium_till {
        separated.push("premium_till = ");
        separated.push_bind_unseparated(premium_till);
        any = true;
    }
    if let Some(grader_valid) = payload.grader_valid {
        separated.push("grader_valid = ");
        separated.push_bind_unseparated(grader_valid);
        any = true;
    }
    if let Some(grader_till) = payload.grader_till {
        separated.push("grader_till = ");
        separated.push_bind_unseparated(grader_till);
        any = true;
    }
    if let Some(grader_weekly_limit) = payload.grader_weekly_limit {
        separated.push("grader_weekly_limit = ");
        separated.push_bind_unseparated(grader_weekly_limit);
        any = true;
    }

    if !any {
        return Ok(StatusCode::OK);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Flips expired premium/grader access flags. Intended to be hit by an
/// external scheduler; the service keeps no in-process cron state.
/// Admin only.
pub async fn expire_access(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let premium = sqlx::query(
        "UPDATE users SET premium_valid = FALSE
         WHERE premium_valid = TRUE AND premium_till IS NOT NULL AND premium_till < NOW()",
    )
    .execute(&pool)
    .await?;

    let grader = sqlx::query(
        "UPDATE users SET grader_valid = FALSE
         WHERE grader_valid = TRUE AND grader_till IS NOT NULL AND grader_till < NOW()",
    )
    .execute(&pool)
    .await?;

    tracing::info!(
        premium_expired = premium.rows_affected(),
        grader_expired = grader.rows_affected(),
        "Access sweep completed"
    );

    Ok(Json(serde_json::json!({
        "premium_expired": premium.rows_affected(),
        "grader_expired": grader.rows_affected(),
    })))
}
