// src/models/paper.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'papers' table: a mock-exam grouping of questions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Paper {
    pub id: i64,
    pub title: String,
    pub subject_code: String,
    pub question_ids: Json<Vec<i64>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'paper_attempts' table: aggregate marks and time a user
/// scored on a paper.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PaperAttempt {
    pub id: i64,
    pub paper_id: i64,
    pub user_id: i64,
    pub marks: i64,
    pub total_time_seconds: f64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a paper (admin).
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaperRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 20))]
    pub subject_code: String,
    #[validate(length(min = 1, max = 200))]
    pub question_ids: Vec<i64>,
}
