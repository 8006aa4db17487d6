// src/models/subject.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Subject reference data: code, name, and the level -> topic -> subtopic
/// tree. Effectively static configuration, loaded once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectCatalog {
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub code: String,
    pub name: String,
    pub levels: Vec<SubjectLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectLevel {
    pub level: String,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    pub subtopics: Vec<String>,
}

impl SubjectCatalog {
    pub fn load(path: &str) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::InternalServerError(format!("Failed to read subject catalog {path}: {e}"))
        })?;
        let catalog: SubjectCatalog = serde_json::from_str(&raw).map_err(|e| {
            AppError::InternalServerError(format!("Failed to parse subject catalog {path}: {e}"))
        })?;
        Ok(catalog)
    }

    pub fn get(&self, code: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.code == code)
    }
}

impl Subject {
    pub fn has_level(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l.level == level)
    }
}

/// Represents the 'user_subjects' table: one row per subject a user has
/// added to their practice list, carrying that user's rolling stats for it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserSubject {
    pub id: i64,
    pub user_id: i64,
    pub subject_code: String,
    pub subject_name: String,
    pub rating: f64,
    pub attempts: i64,
    pub correct_answers: i64,
    pub percentile: f64,
    pub date_added: chrono::DateTime<chrono::Utc>,
}

/// DTO for adding a subject to the user's practice list.
#[derive(Debug, Deserialize, Validate)]
pub struct AddSubjectRequest {
    #[validate(length(min = 1, max = 20))]
    pub subject_code: String,
}
