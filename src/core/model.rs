// src/core/model.rs
//
// Minimal chat-completions client for question generation. We only ever
// request a strict JSON object; calls log model name, latency and response
// size, never the API key or payload contents.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;

/// Seam for the external text-generation collaborator. Whatever comes back
/// is untrusted text; callers validate before persisting any of it.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Requests a single JSON object as raw text.
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, AppError>;
}

#[derive(Clone)]
pub struct ModelClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl ModelClient {
    /// Construct the client if OPENAI_API_KEY is present; otherwise None,
    /// which disables on-demand generation service-wide.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").ok()?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .ok()?;

        Some(Self {
            client,
            api_key,
            base_url,
            model,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for ModelClient {
    async fn complete_json(&self, system: &str, user: &str) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessageReq {
                    role: "system".into(),
                    content: system.into(),
                },
                ChatMessageReq {
                    role: "user".into(),
                    content: user.into(),
                },
            ],
            temperature: 0.9,
            response_format: Some(ResponseFormat {
                r#type: "json_object".into(),
            }),
        };

        let start = std::time::Instant::now();
        let res = self
            .client
            .post(&url)
            .header(USER_AGENT, "asterisk-backend/0.1")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&req)
            .send()
            .await
            .map_err(|e| AppError::Generation(format!("Model request failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let msg = extract_api_error(&body).unwrap_or(body);
            return Err(AppError::Generation(format!("Model HTTP {status}: {msg}")));
        }

        let body: ChatCompletionResponse = res
            .json()
            .await
            .map_err(|e| AppError::Generation(format!("Model response unreadable: {e}")))?;

        if let Some(usage) = &body.usage {
            info!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "Model usage"
            );
        }

        let text = body
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        info!(
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            response_len = text.len(),
            "Model response received"
        );

        Ok(text)
    }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessageReq>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessageReq {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    r#type: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResp,
}

#[derive(Deserialize)]
struct ChatMessageResp {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

/// Try to extract a clean error message from an API error body.
fn extract_api_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct EWrap {
        error: EObj,
    }
    #[derive(Deserialize)]
    struct EObj {
        message: String,
    }
    serde_json::from_str::<EWrap>(body)
        .ok()
        .map(|w| w.error.message)
}
