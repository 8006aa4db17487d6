// src/handlers/practice.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    core::{selector, submission},
    error::AppError,
    handlers::load_user,
    models::attempt::{NextQuestionParams, SubmitAnswerRequest},
    state::AppState,
    utils::jwt::Claims,
};

/// Serves the next question matched to the caller's percentile band.
///
/// `subject_code` is required; level/topics/subtopics are optional filters.
/// Falls back to on-demand generation when no unseen question fits.
pub async fn next_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<NextQuestionParams>,
) -> Result<impl IntoResponse, AppError> {
    let subject_code = params
        .subject_code
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("subject_code is required".to_string()))?;

    let user = load_user(&state.pool, &claims).await?;
    let filter = selector::QuestionFilter::from_params(&params);

    let question = selector::next_question(&state, &user, subject_code, &filter).await?;
    Ok(Json(question))
}

/// Records a submitted answer and returns the updated ratings along with a
/// freshly generated follow-up question.
pub async fn submit_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user = load_user(&state.pool, &claims).await?;
    let response = submission::submit_answer(&state, &user, &payload).await?;
    Ok(Json(response))
}
