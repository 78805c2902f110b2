//! Gemini `generateContent` client.
//!
//! Implements [`ContentGenerator`] over plain reqwest + serde types. Only the
//! slice of the REST API this crate needs is modelled: one user turn of text
//! and inline-data parts, safety settings, and a generation config asking
//! for JSON.

use crate::error::AttemptError;
use crate::pipeline::assemble::{ContentPart, GenerationRequest};
use crate::pipeline::invoke::{ContentGenerator, GenerationSettings, SafetySetting};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: &'a [SafetySetting],
    generation_config: GenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData {
        #[serde(rename = "mimeType")]
        mime_type: &'a str,
        data: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'a str,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn to_wire<'a>(
    request: &'a GenerationRequest,
    settings: &'a GenerationSettings,
) -> GenerateContentRequest<'a> {
    let parts = request
        .parts
        .iter()
        .map(|p| match p {
            ContentPart::Text(t) => Part::Text(t),
            ContentPart::InlineData { mime_type, data } => Part::InlineData { mime_type, data },
        })
        .collect();

    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        safety_settings: &settings.safety_settings,
        generation_config: GenerationConfig {
            response_mime_type: &settings.response_mime_type,
            temperature: settings.temperature,
        },
    }
}

// ── Client ───────────────────────────────────────────────────────────────

/// HTTP client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Build a client with a per-call timeout.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerationRequest,
        settings: &GenerationSettings,
    ) -> Result<String, AttemptError> {
        let body = to_wire(request, settings);
        debug!(
            "POST {} ({} parts, {} payload chars)",
            self.endpoint(model),
            request.parts.len(),
            request.payload_len()
        );

        let response = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(model, self.timeout_secs, e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(model, status, &text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| transport_error(model, self.timeout_secs, e))?;

        extract_text(model, parsed)
    }
}

fn transport_error(model: &str, timeout_secs: u64, e: reqwest::Error) -> AttemptError {
    if e.is_timeout() {
        AttemptError::Timeout {
            model: model.to_string(),
            secs: timeout_secs,
        }
    } else {
        AttemptError::Transport {
            model: model.to_string(),
            detail: e.to_string(),
        }
    }
}

fn status_error(model: &str, status: StatusCode, body: &str) -> AttemptError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|env| env.error.message)
        .unwrap_or_else(|_| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                trimmed.to_string()
            }
        });

    if status == StatusCode::TOO_MANY_REQUESTS {
        AttemptError::RateLimited {
            model: model.to_string(),
            message,
        }
    } else {
        AttemptError::Status {
            model: model.to_string(),
            status: status.as_u16(),
            message,
        }
    }
}

fn extract_text(model: &str, response: GenerateContentResponse) -> Result<String, AttemptError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AttemptError::Blocked {
            model: model.to_string(),
            reason,
        });
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AttemptError::Blocked {
            model: model.to_string(),
            reason: "no candidate in response".to_string(),
        })?;

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                Err(AttemptError::Blocked {
                    model: model.to_string(),
                    reason: reason.to_string(),
                })
            }
            _ => Err(AttemptError::EmptyResponse {
                model: model.to_string(),
            }),
        };
    }

    Ok(text)
}
