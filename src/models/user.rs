// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::subject::UserSubject;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Unique email address.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    /// Whether the signup verification code has been confirmed.
    pub is_verified: bool,

    #[serde(skip)]
    pub verification_code: Option<String>,
    #[serde(skip)]
    pub verification_expires_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Premium access: lifts the daily attempt cap, the subject-count
    /// limit, and the subject-removal cooldown.
    pub premium_valid: bool,
    pub premium_plan: Option<String>,
    pub premium_till: Option<chrono::DateTime<chrono::Utc>>,

    /// Grader access: weekly-limited AI grading entitlement.
    pub grader_valid: bool,
    pub grader_till: Option<chrono::DateTime<chrono::Utc>>,
    pub grader_weekly_limit: i64,

    /// Rolling correct/attempt rating across all selected subjects.
    pub cumulative_rating: f64,
    pub cumulative_percentile: f64,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Aggregated user profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_verified: bool,
    pub premium_valid: bool,
    pub premium_plan: Option<String>,
    pub premium_till: Option<chrono::DateTime<chrono::Utc>>,
    pub grader_valid: bool,
    pub grader_till: Option<chrono::DateTime<chrono::Utc>>,
    pub cumulative_rating: f64,
    pub cumulative_percentile: f64,
    pub selected_subjects: Vec<UserSubject>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for confirming the signup verification code.
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(equal = 6, message = "Verification code must be 6 digits."))]
    pub code: String,
}
