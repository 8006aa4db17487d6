// src/core/generator.rs
//
// On-demand question synthesis. Builds a fixed instruction for the chat
// model, validates its output, and persists the question only when the
// full schema checks out. Retried calls create fresh rows; there is no
// idempotency key.

use serde::Deserialize;
use sqlx::types::Json;
use tracing::info;

use crate::core::percentile::question_difficulty_percentile;
use crate::error::AppError;
use crate::models::question::{OPTION_TAGS, Question, QuestionOption};
use crate::state::AppState;
use crate::utils::html::clean_html;

/// Everything the generator needs to synthesize one question.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub subject_code: String,
    pub subject_name: String,
    pub level: String,
    pub topic: Option<String>,
    pub subtopic: Option<String>,
    /// 0-100; also becomes the new question's initial difficulty rating.
    pub target_difficulty: f64,
}

/// Shape the model is instructed to emit, as a single-line JSON object.
#[derive(Debug, Deserialize)]
struct GeneratedQuestion {
    #[serde(rename = "questionText")]
    question_text: String,
    options: Vec<GeneratedOption>,
    #[serde(rename = "correctOption")]
    correct_option: String,
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedOption {
    option: String,
    text: String,
}

fn build_prompts(req: &GenerationRequest) -> (String, String) {
    let system = format!(
        "You are an examiner writing multiple-choice questions for {} {} (syllabus {}). \
         Respond with exactly one single-line JSON object and nothing else: no markdown, \
         no code fences, no commentary. The object must have the fields \"questionText\" \
         (string), \"options\" (array of exactly 4 objects {{\"option\": \"A\"|\"B\"|\"C\"|\"D\", \
         \"text\": string}}, one per tag), \"correctOption\" (the tag of the single correct \
         option), and \"explanation\" (string).",
        req.level, req.subject_name, req.subject_code
    );

    // Harder questions warrant longer worked explanations.
    let explanation_words = (30.0 + req.target_difficulty * 0.7).round() as i64;

    let mut user = format!(
        "Write one question at difficulty {:.0} on a 0-100 scale, where 0 means nearly \
         every student answers correctly and 100 means almost none do.",
        req.target_difficulty
    );
    if let Some(topic) = &req.topic {
        user.push_str(&format!(" Topic: {topic}."));
    }
    if let Some(subtopic) = &req.subtopic {
        user.push_str(&format!(" Subtopic: {subtopic}."));
    }
    user.push_str(&format!(
        " The explanation should be roughly {explanation_words} words and walk through why \
         the correct option is right and the others are wrong."
    ));

    (system, user)
}

/// Locates and parses the JSON object in the model's raw output.
/// Tolerates surrounding prose and code fences; anything that does not
/// contain a parseable object of the expected shape is rejected.
fn parse_generated(raw: &str) -> Result<GeneratedQuestion, AppError> {
    let start = raw.find('{');
    let end = raw.rfind('}');
    let object = match (start, end) {
        (Some(s), Some(e)) if s < e => &raw[s..=e],
        _ => {
            return Err(AppError::Generation(
                "Model output contained no JSON object".to_string(),
            ));
        }
    };

    let generated: GeneratedQuestion = serde_json::from_str(object)
        .map_err(|e| AppError::Generation(format!("Model output was not valid JSON: {e}")))?;

    validate_generated(&generated)?;
    Ok(generated)
}

fn validate_generated(generated: &GeneratedQuestion) -> Result<(), AppError> {
    if generated.question_text.trim().is_empty() {
        return Err(AppError::Generation(
            "Generated question has empty questionText".to_string(),
        ));
    }
    if generated.explanation.trim().is_empty() {
        return Err(AppError::Generation(
            "Generated question has empty explanation".to_string(),
        ));
    }
    if generated.options.len() != 4 {
        return Err(AppError::Generation(format!(
            "Generated question has {} options, expected 4",
            generated.options.len()
        )));
    }
    for tag in OPTION_TAGS {
        let matching = generated.options.iter().filter(|o| o.option == tag).count();
        if matching != 1 {
            return Err(AppError::Generation(format!(
                "Generated options must carry each tag A-D exactly once (tag {tag} appears {matching} times)"
            )));
        }
    }
    if generated.options.iter().any(|o| o.text.trim().is_empty()) {
        return Err(AppError::Generation(
            "Generated question has an empty option text".to_string(),
        ));
    }
    if !OPTION_TAGS.contains(&generated.correct_option.as_str()) {
        return Err(AppError::Generation(format!(
            "Generated correctOption '{}' is not one of A-D",
            generated.correct_option
        )));
    }
    Ok(())
}

/// Calls the model, validates the output, and persists a new question with
/// zeroed stats and the target difficulty as its initial rating. Nothing is
/// written when parsing or validation fails.
pub async fn generate_question(
    state: &AppState,
    req: &GenerationRequest,
) -> Result<Question, AppError> {
    let model = state.model.as_ref().ok_or_else(|| {
        AppError::Generation("Question generation is not configured".to_string())
    })?;

    let (system, user) = build_prompts(req);
    let raw = model.complete_json(&system, &user).await?;
    let generated = parse_generated(&raw)?;

    // Model output is untrusted; strip any HTML before it reaches storage.
    let mut options: Vec<QuestionOption> = generated
        .options
        .iter()
        .map(|o| QuestionOption {
            option: o.option.clone(),
            text: clean_html(&o.text),
            image: None,
        })
        .collect();
    options.sort_by(|a, b| a.option.cmp(&b.option));

    let question_text = clean_html(&generated.question_text);
    let explanation = clean_html(&generated.explanation);

    let mut conn = state.pool.acquire().await?;
    let difficulty_percentile = question_difficulty_percentile(
        &mut *conn,
        &req.subject_code,
        req.target_difficulty,
    )
    .await?;

    let question = sqlx::query_as::<_, Question>(
        r#"
        INSERT INTO questions
            (subject_code, subject_name, level, topic, subtopic, question_text,
             options, correct_option, explanation, difficulty_rating,
             difficulty_percentile, source)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'generated')
        RETURNING *
        "#,
    )
    .bind(&req.subject_code)
    .bind(&req.subject_name)
    .bind(&req.level)
    .bind(&req.topic)
    .bind(&req.subtopic)
    .bind(&question_text)
    .bind(Json(options))
    .bind(&generated.correct_option)
    .bind(&explanation)
    .bind(req.target_difficulty)
    .bind(difficulty_percentile)
    .fetch_one(&mut *conn)
    .await?;

    info!(
        question_id = question.id,
        subject = %req.subject_code,
        difficulty = req.target_difficulty,
        "Generated new question"
    );

    Ok(question)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"questionText":"What is 2 + 2?","options":[{"option":"A","text":"3"},{"option":"B","text":"4"},{"option":"C","text":"5"},{"option":"D","text":"22"}],"correctOption":"B","explanation":"Adding two and two gives four."}"#;

    fn request() -> GenerationRequest {
        GenerationRequest {
            subject_code: "0580".into(),
            subject_name: "Mathematics".into(),
            level: "IGCSE".into(),
            topic: Some("Number".into()),
            subtopic: None,
            target_difficulty: 62.0,
        }
    }

    #[test]
    fn parses_bare_object() {
        let q = parse_generated(VALID).unwrap();
        assert_eq!(q.correct_option, "B");
        assert_eq!(q.options.len(), 4);
    }

    #[test]
    fn parses_object_wrapped_in_code_fence() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_generated(&fenced).is_ok());
    }

    #[test]
    fn parses_object_wrapped_in_prose() {
        let chatty = format!("Sure! Here is your question:\n{VALID}\nLet me know if it works.");
        assert!(parse_generated(&chatty).is_ok());
    }

    #[test]
    fn rejects_non_json_output() {
        let err = parse_generated("I'm sorry, I can't produce that.").unwrap_err();
        assert!(matches!(err, AppError::Generation(_)));
    }

    #[test]
    fn rejects_truncated_json() {
        let truncated = &VALID[..VALID.len() - 20];
        assert!(parse_generated(truncated).is_err());
    }

    #[test]
    fn rejects_missing_fields() {
        let no_explanation =
            r#"{"questionText":"q","options":[{"option":"A","text":"1"},{"option":"B","text":"2"},{"option":"C","text":"3"},{"option":"D","text":"4"}],"correctOption":"A"}"#;
        assert!(parse_generated(no_explanation).is_err());
    }

    #[test]
    fn rejects_wrong_option_count() {
        let three = r#"{"questionText":"q","options":[{"option":"A","text":"1"},{"option":"B","text":"2"},{"option":"C","text":"3"}],"correctOption":"A","explanation":"e"}"#;
        assert!(parse_generated(three).is_err());
    }

    #[test]
    fn rejects_duplicate_tags() {
        let dupes = r#"{"questionText":"q","options":[{"option":"A","text":"1"},{"option":"A","text":"2"},{"option":"C","text":"3"},{"option":"D","text":"4"}],"correctOption":"A","explanation":"e"}"#;
        assert!(parse_generated(dupes).is_err());
    }

    #[test]
    fn rejects_correct_option_outside_tags() {
        let bad = r#"{"questionText":"q","options":[{"option":"A","text":"1"},{"option":"B","text":"2"},{"option":"C","text":"3"},{"option":"D","text":"4"}],"correctOption":"E","explanation":"e"}"#;
        assert!(parse_generated(bad).is_err());
    }

    #[test]
    fn explanation_length_request_scales_with_difficulty() {
        let mut easy = request();
        easy.target_difficulty = 10.0;
        let mut hard = request();
        hard.target_difficulty = 90.0;

        let (_, easy_user) = build_prompts(&easy);
        let (_, hard_user) = build_prompts(&hard);
        assert!(easy_user.contains("37 words"));
        assert!(hard_user.contains("93 words"));
    }
}
