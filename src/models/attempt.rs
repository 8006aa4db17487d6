// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::Question;

/// Represents the 'attempts' table: the user's append-only solve history.
/// Rows are never mutated after insert; they feed the unseen-question
/// exclusion list and all time-windowed stats.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub subject_code: String,
    pub answer: String,
    pub time_taken_seconds: f64,
    pub is_correct: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Query parameters for serving the next question.
/// All filters are explicit optional fields; absent means unfiltered.
#[derive(Debug, Deserialize)]
pub struct NextQuestionParams {
    pub subject_code: Option<String>,
    pub level: Option<String>,
    /// Comma-separated topic names, OR-matched.
    pub topics: Option<String>,
    /// Comma-separated subtopic names; one is picked at random.
    pub subtopics: Option<String>,
}

/// DTO for submitting an answer.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    #[validate(length(equal = 1))]
    pub answer: String,
    /// Correctness as computed by the client against the served question.
    pub is_correct: bool,
    #[validate(range(min = 0.0, max = 86400.0))]
    pub time_taken_seconds: f64,
    #[validate(length(min = 1, max = 20))]
    pub subject_code: String,
    #[validate(length(max = 20))]
    pub level: Option<String>,
    #[validate(length(max = 200))]
    pub topic: Option<String>,
    #[validate(length(max = 200))]
    pub subtopic: Option<String>,
    /// Difficulty rating the question carried when it was served.
    #[validate(range(min = 0.0, max = 100.0))]
    pub served_difficulty: f64,
}

/// Acknowledgment returned after a submission, with the freshly generated
/// follow-up question when generation succeeded.
#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub message: String,
    pub subject_rating: f64,
    pub subject_percentile: f64,
    pub cumulative_rating: f64,
    pub cumulative_percentile: f64,
    pub next_question: Option<Question>,
}

/// Query parameters for the attempt-history listing.
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub limit: Option<i64>,
}
