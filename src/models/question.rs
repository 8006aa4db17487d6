// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use url::Url;
use validator::Validate;

/// Exam levels a question can belong to.
pub const LEVELS: [&str; 3] = ["IGCSE", "AS-Level", "A-Level"];

/// Option tags, in serving order.
pub const OPTION_TAGS: [&str; 4] = ["A", "B", "C", "D"];

pub fn is_valid_level(level: &str) -> bool {
    LEVELS.contains(&level)
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub subject_code: String,
    pub subject_name: String,

    /// One of `LEVELS`.
    pub level: String,

    pub topic: Option<String>,
    pub subtopic: Option<String>,

    pub question_text: String,

    /// The four answer options, tagged A-D.
    /// Stored as a JSONB array in the database.
    pub options: Json<Vec<QuestionOption>>,

    /// Tag of the correct option ('A'..'D').
    pub correct_option: String,

    pub explanation: String,

    /// Rolling stats, mutated on every submission referencing this question.
    pub total_attempts: i64,
    pub total_correct: i64,
    pub average_time_seconds: f64,

    /// Wrong-answer rate in [0,100], recomputed once enough attempts accrue.
    pub difficulty_rating: f64,
    /// This question's difficulty rank among questions of the same subject.
    pub difficulty_percentile: f64,

    /// Where the question came from: 'seed', 'admin', or 'generated'.
    pub source: String,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Tag: 'A', 'B', 'C', or 'D'.
    pub option: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// DTO for creating a new question (admin).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 20))]
    pub subject_code: String,
    #[validate(length(min = 1, max = 20))]
    pub level: String,
    #[validate(length(max = 200))]
    pub topic: Option<String>,
    #[validate(length(max = 200))]
    pub subtopic: Option<String>,
    #[validate(length(min = 1, max = 4000))]
    pub question_text: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<QuestionOption>,
    #[validate(length(equal = 1))]
    pub correct_option: String,
    #[validate(length(min = 1, max = 8000))]
    pub explanation: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub difficulty_rating: Option<f64>,
}

fn validate_options(options: &[QuestionOption]) -> Result<(), validator::ValidationError> {
    if options.len() != 4 {
        return Err(validator::ValidationError::new("exactly_four_options_required"));
    }
    for (opt, tag) in options.iter().zip(OPTION_TAGS.iter()) {
        if opt.option != *tag {
            return Err(validator::ValidationError::new("options_must_be_tagged_a_to_d"));
        }
        if opt.text.is_empty() || opt.text.len() > 2000 {
            return Err(validator::ValidationError::new("option_text_length"));
        }
        if let Some(image) = &opt.image {
            if Url::parse(image).is_err() {
                return Err(validator::ValidationError::new("invalid_image_url"));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(tag: &str, text: &str) -> QuestionOption {
        QuestionOption {
            option: tag.to_string(),
            text: text.to_string(),
            image: None,
        }
    }

    #[test]
    fn options_must_be_four() {
        let three = vec![opt("A", "a"), opt("B", "b"), opt("C", "c")];
        assert!(validate_options(&three).is_err());

        let four = vec![opt("A", "a"), opt("B", "b"), opt("C", "c"), opt("D", "d")];
        assert!(validate_options(&four).is_ok());
    }

    #[test]
    fn options_must_be_tagged_in_order() {
        let shuffled = vec![opt("B", "a"), opt("A", "b"), opt("C", "c"), opt("D", "d")];
        assert!(validate_options(&shuffled).is_err());
    }

    #[test]
    fn option_image_must_be_a_url() {
        let mut opts = vec![opt("A", "a"), opt("B", "b"), opt("C", "c"), opt("D", "d")];
        opts[2].image = Some("not a url".to_string());
        assert!(validate_options(&opts).is_err());

        opts[2].image = Some("https://img.example.com/q1.png".to_string());
        assert!(validate_options(&opts).is_ok());
    }
}
