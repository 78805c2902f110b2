//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use study_guardian::pipeline::assemble::GenerationRequest;
use study_guardian::pipeline::invoke::GenerationSettings;
use study_guardian::{Analyzer, AnalyzerConfig, AttemptError, ContentGenerator};

pub const GUIDE_JSON: &str = r#"{
  "summary": "- Mitosis makes two identical cells",
  "examQuestions": ["What is mitosis?", "List the phases.", "What is cytokinesis?", "Why is mitosis needed?", "Compare mitosis and meiosis."],
  "explanation": "A cell copies its DNA and splits in two.",
  "studyPlan": "Day 1: phases. Day 2: practice questions."
}"#;

/// One recorded generator call.
#[derive(Debug, Clone)]
pub struct Call {
    pub model: String,
    pub api_key: String,
    pub request: GenerationRequest,
}

/// In-memory generator answering from a per-model script.
///
/// Models missing from the script fail with a 404-style status error.
#[derive(Default)]
pub struct Scripted {
    replies: HashMap<String, Result<String, AttemptError>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
}

impl Scripted {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, model: &str, text: &str) -> Self {
        self.replies.insert(model.to_string(), Ok(text.to_string()));
        self
    }

    pub fn fail(mut self, model: &str, error: AttemptError) -> Self {
        self.replies.insert(model.to_string(), Err(error));
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for Scripted {
    async fn generate(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerationRequest,
        _settings: &GenerationSettings,
    ) -> Result<String, AttemptError> {
        self.calls.lock().unwrap().push(Call {
            model: model.to_string(),
            api_key: api_key.to_string(),
            request: request.clone(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .get(model)
            .cloned()
            .unwrap_or_else(|| {
                Err(AttemptError::Status {
                    model: model.to_string(),
                    status: 404,
                    message: format!("models/{model} is not found"),
                })
            })
    }
}

/// Route library logs to the test harness; `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn config(models: &[&str]) -> AnalyzerConfig {
    AnalyzerConfig::builder()
        .models(models.iter().copied())
        .api_key("test-key")
        .build()
        .unwrap()
}

pub fn analyzer(config: AnalyzerConfig, generator: Arc<Scripted>) -> Arc<Analyzer> {
    Arc::new(Analyzer::with_generator(config, generator))
}

/// Hand-built `multipart/form-data` body.
pub struct Form {
    boundary: String,
    body: Vec<u8>,
}

impl Form {
    pub fn new() -> Self {
        Self {
            boundary: "----study-guardian-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri("/api/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}
