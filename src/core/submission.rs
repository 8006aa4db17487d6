// src/core/submission.rs
//
// Submission orchestration: fold one attempt into the question's rolling
// stats, the user's history, the per-subject stats, and the cumulative
// stats, then hand back a freshly generated follow-up question.
//
// Concurrent submissions by the same user are serialized through the
// per-user lock in AppState, and the paired question/user writes commit in
// one transaction, so a racing pair can no longer silently drop an update.

use tracing::{info, warn};

use crate::core::generator::{self, GenerationRequest};
use crate::core::percentile::{
    cumulative_rating_percentile, question_difficulty_percentile, subject_rating_percentile,
};
use crate::core::quota::{check_daily_quota, check_subject_capacity, selected_subject_count};
use crate::core::rating::{incremental_mean, next_difficulty, rating};
use crate::error::AppError;
use crate::models::attempt::{SubmitAnswerRequest, SubmitAnswerResponse};
use crate::models::question::{OPTION_TAGS, Question};
use crate::models::subject::UserSubject;
use crate::models::user::User;
use crate::state::AppState;

pub async fn submit_answer(
    state: &AppState,
    user: &User,
    req: &SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, AppError> {
    if !OPTION_TAGS.contains(&req.answer.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Answer '{}' is not one of A-D",
            req.answer
        )));
    }

    let subject = state
        .catalog
        .get(&req.subject_code)
        .ok_or_else(|| AppError::NotFound(format!("Unknown subject code '{}'", req.subject_code)))?;

    let lock = state.user_lock(user.id).await;
    let _guard = lock.lock().await;

    let mut conn = state.pool.acquire().await?;
    check_daily_quota(&mut *conn, user, state.config.free_daily_attempt_limit).await?;

    let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = $1")
        .bind(req.question_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;
    drop(conn);

    // Correctness is the caller's claim (the client grades against the
    // served question). A mismatch with the stored key is worth a trace.
    let server_side_correct = req.answer == question.correct_option;
    if server_side_correct != req.is_correct {
        warn!(
            user_id = user.id,
            question_id = question.id,
            claimed = req.is_correct,
            "Submitted correctness flag disagrees with the stored answer key"
        );
    }

    let mut tx = state.pool.begin().await?;

    // Question rolling stats.
    let total_attempts = question.total_attempts + 1;
    let total_correct = question.total_correct + i64::from(req.is_correct);
    let average_time =
        incremental_mean(question.average_time_seconds, total_attempts, req.time_taken_seconds);
    let new_difficulty = next_difficulty(question.difficulty_rating, total_attempts, total_correct);
    let difficulty_pct =
        question_difficulty_percentile(&mut *tx, &question.subject_code, new_difficulty).await?;

    sqlx::query(
        r#"
        UPDATE questions
        SET total_attempts = $1, total_correct = $2, average_time_seconds = $3,
            difficulty_rating = $4, difficulty_percentile = $5
        WHERE id = $6
        "#,
    )
    .bind(total_attempts)
    .bind(total_correct)
    .bind(average_time)
    .bind(new_difficulty)
    .bind(difficulty_pct)
    .bind(question.id)
    .execute(&mut *tx)
    .await?;

    // Immutable history entry.
    sqlx::query(
        r#"
        INSERT INTO attempts (user_id, question_id, subject_code, answer,
                              time_taken_seconds, is_correct)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(user.id)
    .bind(question.id)
    .bind(&req.subject_code)
    .bind(&req.answer)
    .bind(req.time_taken_seconds)
    .bind(req.is_correct)
    .execute(&mut *tx)
    .await?;

    // Per-subject stats, creating the row on first attempt in a subject.
    let existing = sqlx::query_as::<_, UserSubject>(
        "SELECT * FROM user_subjects WHERE user_id = $1 AND subject_code = $2",
    )
    .bind(user.id)
    .bind(&req.subject_code)
    .fetch_optional(&mut *tx)
    .await?;

    let (subject_attempts, subject_correct) = match &existing {
        Some(row) => (row.attempts + 1, row.correct_answers + i64::from(req.is_correct)),
        None => {
            let current = selected_subject_count(&mut *tx, user.id).await?;
            check_subject_capacity(user, current, state.config.free_subject_limit)?;
            (1, i64::from(req.is_correct))
        }
    };

    let subject_rating = rating(subject_attempts, subject_correct);
    let subject_percentile =
        subject_rating_percentile(&mut *tx, &req.subject_code, subject_rating).await?;

    match &existing {
        Some(row) => {
            sqlx::query(
                r#"
                UPDATE user_subjects
                SET rating = $1, attempts = $2, correct_answers = $3, percentile = $4
                WHERE id = $5
                "#,
            )
            .bind(subject_rating)
            .bind(subject_attempts)
            .bind(subject_correct)
            .bind(subject_percentile)
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            sqlx::query(
                r#"
                INSERT INTO user_subjects
                    (user_id, subject_code, subject_name, rating, attempts,
                     correct_answers, percentile)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(user.id)
            .bind(&subject.code)
            .bind(&subject.name)
            .bind(subject_rating)
            .bind(subject_attempts)
            .bind(subject_correct)
            .bind(subject_percentile)
            .execute(&mut *tx)
            .await?;
        }
    }

    // Cumulative stats across all of the user's subjects.
    let (all_attempts, all_correct): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(attempts), 0)::BIGINT,
               COALESCE(SUM(correct_answers), 0)::BIGINT
        FROM user_subjects WHERE user_id = $1
        "#,
    )
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await?;

    let cumulative_rating = rating(all_attempts, all_correct);
    let cumulative_percentile = cumulative_rating_percentile(&mut *tx, cumulative_rating).await?;

    sqlx::query("UPDATE users SET cumulative_rating = $1, cumulative_percentile = $2 WHERE id = $3")
        .bind(cumulative_rating)
        .bind(cumulative_percentile)
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(
        user_id = user.id,
        question_id = question.id,
        correct = req.is_correct,
        subject_rating,
        subject_percentile,
        "Submission recorded"
    );

    // Follow-up question, seeded with the same topic/subtopic at the
    // post-update percentile. The submission is already committed, so a
    // generation failure degrades to an acknowledgment without a question.
    let request = GenerationRequest {
        subject_code: subject.code.clone(),
        subject_name: subject.name.clone(),
        level: req.level.clone().unwrap_or_else(|| question.level.clone()),
        topic: req.topic.clone().or_else(|| question.topic.clone()),
        subtopic: req.subtopic.clone().or_else(|| question.subtopic.clone()),
        target_difficulty: subject_percentile,
    };

    let next_question = match generator::generate_question(state, &request).await {
        Ok(q) => Some(q),
        Err(e) => {
            warn!(user_id = user.id, error = %e, "Follow-up generation failed");
            None
        }
    };

    Ok(SubmitAnswerResponse {
        message: "Answer recorded".to_string(),
        subject_rating,
        subject_percentile,
        cumulative_rating,
        cumulative_percentile,
        next_question,
    })
}
