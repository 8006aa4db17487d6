// src/core/selector.rs
//
// Adaptive question selection: match an unseen question to the caller's
// current percentile band, or fall back to on-demand generation when the
// corpus has nothing suitable.

use rand::seq::SliceRandom;
use sqlx::{Postgres, QueryBuilder};
use tracing::info;

use crate::config::NEUTRAL_RATING;
use crate::core::generator::{self, GenerationRequest};
use crate::core::percentile::band;
use crate::core::quota::check_daily_quota;
use crate::error::AppError;
use crate::models::attempt::NextQuestionParams;
use crate::models::question::{Question, is_valid_level};
use crate::models::user::User;
use crate::state::AppState;

/// Explicit optional filters for question selection. Absent means
/// unfiltered, so query construction is total.
#[derive(Debug, Clone, Default)]
pub struct QuestionFilter {
    pub level: Option<String>,
    pub topics: Option<Vec<String>>,
    pub subtopics: Option<Vec<String>>,
}

impl QuestionFilter {
    pub fn from_params(params: &NextQuestionParams) -> Self {
        Self {
            level: params.level.clone().filter(|l| !l.is_empty()),
            topics: split_csv(params.topics.as_deref()),
            subtopics: split_csv(params.subtopics.as_deref()),
        }
    }
}

fn split_csv(raw: Option<&str>) -> Option<Vec<String>> {
    let values: Vec<String> = raw?
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if values.is_empty() { None } else { Some(values) }
}

fn pick_one(values: &[String]) -> Option<String> {
    values.choose(&mut rand::thread_rng()).cloned()
}

/// Serves the next question for a user in a subject.
///
/// Quota is checked before anything else touches the store. The band is the
/// user's subject percentile (neutral default for fresh subjects) widened by
/// the configured tolerance and clamped to [0,100]. Questions the user has
/// already attempted are excluded; one match is sampled uniformly at random
/// so a fixed ordering never biases what gets served. A miss falls through
/// to generation targeted at the user's percentile.
///
/// Served questions are not reserved: concurrent requests may receive the
/// same question.
pub async fn next_question(
    state: &AppState,
    user: &User,
    subject_code: &str,
    filter: &QuestionFilter,
) -> Result<Question, AppError> {
    let subject = state
        .catalog
        .get(subject_code)
        .ok_or_else(|| AppError::NotFound(format!("Unknown subject code '{subject_code}'")))?;

    if let Some(level) = &filter.level {
        if !is_valid_level(level) {
            return Err(AppError::BadRequest(format!("Unknown level '{level}'")));
        }
        if !subject.has_level(level) {
            return Err(AppError::BadRequest(format!(
                "Subject '{}' is not offered at {level}",
                subject.code
            )));
        }
    }

    let mut conn = state.pool.acquire().await?;
    check_daily_quota(&mut *conn, user, state.config.free_daily_attempt_limit).await?;

    let percentile: f64 = sqlx::query_scalar(
        "SELECT percentile FROM user_subjects WHERE user_id = $1 AND subject_code = $2",
    )
    .bind(user.id)
    .bind(subject_code)
    .fetch_optional(&mut *conn)
    .await?
    .unwrap_or(NEUTRAL_RATING);

    let (lo, hi) = band(percentile, state.config.difficulty_tolerance);

    // When several subtopics are requested, one is chosen uniformly at
    // random and queried alone. Inherited behavior; see DESIGN.md.
    let chosen_subtopic = filter.subtopics.as_deref().and_then(pick_one);

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM questions WHERE subject_code = ");
    qb.push_bind(subject_code.to_string());
    qb.push(" AND difficulty_rating >= ");
    qb.push_bind(lo);
    qb.push(" AND difficulty_rating <= ");
    qb.push_bind(hi);
    qb.push(" AND id NOT IN (SELECT question_id FROM attempts WHERE user_id = ");
    qb.push_bind(user.id);
    qb.push(")");

    if let Some(level) = &filter.level {
        qb.push(" AND level = ");
        qb.push_bind(level.clone());
    }
    if let Some(topics) = &filter.topics {
        qb.push(" AND topic IN (");
        let mut separated = qb.separated(",");
        for topic in topics {
            separated.push_bind(topic.clone());
        }
        separated.push_unseparated(")");
    }
    if let Some(subtopic) = &chosen_subtopic {
        qb.push(" AND subtopic = ");
        qb.push_bind(subtopic.clone());
    }

    qb.push(" ORDER BY RANDOM() LIMIT 1");

    let found = qb
        .build_query_as::<Question>()
        .fetch_optional(&mut *conn)
        .await?;
    drop(conn);

    if let Some(question) = found {
        info!(
            user_id = user.id,
            question_id = question.id,
            subject = %subject_code,
            band_lo = lo,
            band_hi = hi,
            "Serving existing question"
        );
        return Ok(question);
    }

    // Nothing unseen in the band; synthesize one at the user's percentile.
    let level = filter.level.clone().unwrap_or_else(|| {
        subject
            .levels
            .first()
            .map(|l| l.level.clone())
            .unwrap_or_else(|| "IGCSE".to_string())
    });
    let topic = filter.topics.as_deref().and_then(pick_one);

    let request = GenerationRequest {
        subject_code: subject.code.clone(),
        subject_name: subject.name.clone(),
        level,
        topic,
        subtopic: chosen_subtopic,
        target_difficulty: percentile,
    };

    info!(
        user_id = user.id,
        subject = %subject_code,
        target = percentile,
        "No unseen question in band; generating"
    );

    generator::generate_question(state, &request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_splitting_trims_and_drops_empties() {
        let params = NextQuestionParams {
            subject_code: Some("0620".into()),
            level: Some("IGCSE".into()),
            topics: Some(" Stoichiometry , Organic chemistry ,".into()),
            subtopics: None,
        };
        let filter = QuestionFilter::from_params(&params);
        assert_eq!(
            filter.topics,
            Some(vec![
                "Stoichiometry".to_string(),
                "Organic chemistry".to_string()
            ])
        );
        assert_eq!(filter.subtopics, None);
    }

    #[test]
    fn empty_csv_means_no_filter() {
        let params = NextQuestionParams {
            subject_code: None,
            level: None,
            topics: Some(" , ,".into()),
            subtopics: Some(String::new()),
        };
        let filter = QuestionFilter::from_params(&params);
        assert_eq!(filter.topics, None);
        assert_eq!(filter.subtopics, None);
    }

    #[test]
    fn subtopic_pick_is_a_member_of_the_input() {
        let subs = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        for _ in 0..50 {
            let picked = pick_one(&subs).unwrap();
            assert!(subs.contains(&picked));
        }
        assert_eq!(pick_one(&[]), None);
    }
}
