//! Model invocation: try candidate models in order until one answers.
//!
//! ## Fallback Strategy
//!
//! Candidates are tried strictly one after another, never raced. Each
//! attempt yields `Result<String, AttemptError>`; the fold keeps the first
//! success, or, when everything fails, the *first* failure. The first
//! failure is usually the most diagnostic one (a bad key or a rejected
//! document fails the same way on every later model), so later errors are
//! logged and dropped.

use crate::config::AnalyzerConfig;
use crate::error::{AttemptError, StudyGuardianError};
use crate::keys::KeyRing;
use crate::pipeline::assemble::GenerationRequest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Mime type requested for every response.
pub const JSON_MIME_TYPE: &str = "application/json";

/// Harm categories the safety filter is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::Harassment,
        HarmCategory::HateSpeech,
        HarmCategory::SexuallyExplicit,
        HarmCategory::DangerousContent,
    ];
}

/// How aggressively the service blocks content in a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    /// Never block. (default)
    #[default]
    BlockNone,
    BlockOnlyHigh,
    BlockMediumAndAbove,
    BlockLowAndAbove,
    /// Turn the filter off entirely.
    Off,
}

/// One category/threshold pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// The same threshold for every harm category.
pub fn uniform_safety_settings(threshold: HarmBlockThreshold) -> Vec<SafetySetting> {
    HarmCategory::ALL
        .iter()
        .map(|&category| SafetySetting {
            category,
            threshold,
        })
        .collect()
}

/// Per-call generation parameters shared by every candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub response_mime_type: String,
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerationSettings {
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            temperature: config.temperature,
            response_mime_type: JSON_MIME_TYPE.to_string(),
            safety_settings: uniform_safety_settings(config.safety_threshold),
        }
    }
}

/// A backend able to run one generation call against one model.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Generate a response and return its raw text.
    async fn generate(
        &self,
        model: &str,
        api_key: &str,
        request: &GenerationRequest,
        settings: &GenerationSettings,
    ) -> Result<String, AttemptError>;
}

/// The successful outcome of [`invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Raw response text, not yet parsed.
    pub text: String,
    /// Identifier of the model that produced `text`.
    pub model: String,
    /// Number of candidates tried, including the successful one.
    pub attempts: usize,
}

/// Run the request against each candidate model in order.
///
/// # Errors
/// - [`StudyGuardianError::ProviderNotConfigured`] when `keys` is empty; no
///   call is made.
/// - [`StudyGuardianError::UpstreamFailure`] carrying the first attempt's
///   error when every candidate fails.
/// - [`StudyGuardianError::NoCandidates`] when `models` is empty.
pub async fn invoke(
    generator: &dyn ContentGenerator,
    keys: &KeyRing,
    models: &[String],
    request: &GenerationRequest,
    settings: &GenerationSettings,
) -> Result<Invocation, StudyGuardianError> {
    let api_key = keys
        .next_key()
        .ok_or(StudyGuardianError::ProviderNotConfigured)?;

    let mut first_error: Option<AttemptError> = None;

    for (attempt, model) in models.iter().enumerate() {
        let start = Instant::now();
        info!("Attempting analysis with model: {}", model);

        match generator.generate(model, api_key, request, settings).await {
            Ok(text) => {
                debug!(
                    "{}: {} chars in {:?}",
                    model,
                    text.len(),
                    start.elapsed()
                );
                info!("Success with model: {}", model);
                return Ok(Invocation {
                    text,
                    model: model.clone(),
                    attempts: attempt + 1,
                });
            }
            Err(e) => {
                warn!(
                    "Attempt {}/{} with {} failed: {}",
                    attempt + 1,
                    models.len(),
                    model,
                    e
                );
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(first_error) => {
            error!("Analysis failed on all {} candidate models", models.len());
            Err(StudyGuardianError::UpstreamFailure {
                attempts: models.len(),
                first_error,
            })
        }
        None => Err(StudyGuardianError::NoCandidates),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fails for every model in `failing`, succeeds with `"{model}-ok"` otherwise.
    struct Scripted {
        failing: HashMap<String, AttemptError>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl Scripted {
        fn new(failing: &[(&str, u16)]) -> Self {
            let failing = failing
                .iter()
                .map(|(m, status)| {
                    (
                        m.to_string(),
                        AttemptError::Status {
                            model: m.to_string(),
                            status: *status,
                            message: format!("{m} unavailable"),
                        },
                    )
                })
                .collect();
            Self {
                failing,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContentGenerator for Scripted {
        async fn generate(
            &self,
            model: &str,
            api_key: &str,
            _request: &GenerationRequest,
            _settings: &GenerationSettings,
        ) -> Result<String, AttemptError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), api_key.to_string()));
            match self.failing.get(model) {
                Some(e) => Err(e.clone()),
                None => Ok(format!("{model}-ok")),
            }
        }
    }

    fn models(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn settings() -> GenerationSettings {
        GenerationSettings::from_config(&AnalyzerConfig::default())
    }

    #[tokio::test]
    async fn last_candidate_succeeds_after_failures() {
        let gen = Scripted::new(&[("a", 500), ("b", 503)]);
        let keys = KeyRing::new(vec!["k".into()]);
        let inv = invoke(&gen, &keys, &models(&["a", "b", "c"]), &GenerationRequest::default(), &settings())
            .await
            .unwrap();
        assert_eq!(inv.text, "c-ok");
        assert_eq!(inv.model, "c");
        assert_eq!(inv.attempts, 3);
    }

    #[tokio::test]
    async fn first_error_wins_when_all_fail() {
        let gen = Scripted::new(&[("a", 403), ("b", 500), ("c", 503)]);
        let keys = KeyRing::new(vec!["k".into()]);
        let err = invoke(&gen, &keys, &models(&["a", "b", "c"]), &GenerationRequest::default(), &settings())
            .await
            .unwrap_err();
        match err {
            StudyGuardianError::UpstreamFailure {
                attempts,
                first_error,
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(first_error.model(), "a");
                assert!(matches!(first_error, AttemptError::Status { status: 403, .. }));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(gen.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn stops_after_first_success() {
        let gen = Scripted::new(&[]);
        let keys = KeyRing::new(vec!["k".into()]);
        invoke(&gen, &keys, &models(&["a", "b"]), &GenerationRequest::default(), &settings())
            .await
            .unwrap();
        assert_eq!(gen.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_key_makes_no_call() {
        let gen = Scripted::new(&[]);
        let keys = KeyRing::new(Vec::new());
        let err = invoke(&gen, &keys, &models(&["a"]), &GenerationRequest::default(), &settings())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyGuardianError::ProviderNotConfigured));
        assert!(gen.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_key_per_invocation() {
        let gen = Scripted::new(&[("a", 500)]);
        let keys = KeyRing::new(vec!["k1".into(), "k2".into()]);
        let req = GenerationRequest::default();
        invoke(&gen, &keys, &models(&["a", "b"]), &req, &settings()).await.unwrap();
        invoke(&gen, &keys, &models(&["b"]), &req, &settings()).await.unwrap();

        let calls = gen.calls.lock().unwrap();
        let used: Vec<&str> = calls.iter().map(|(_, k)| k.as_str()).collect();
        assert_eq!(used, vec!["k1", "k1", "k2"]);
    }

    #[tokio::test]
    async fn empty_candidate_list() {
        let gen = Scripted::new(&[]);
        let keys = KeyRing::new(vec!["k".into()]);
        let err = invoke(&gen, &keys, &[], &GenerationRequest::default(), &settings())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "AI model failed to respond.");
    }

    #[test]
    fn default_settings_are_permissive_json() {
        let s = settings();
        assert_eq!(s.response_mime_type, "application/json");
        assert_eq!(s.temperature, 0.7);
        assert_eq!(s.safety_settings.len(), 4);
        assert!(s
            .safety_settings
            .iter()
            .all(|x| x.threshold == HarmBlockThreshold::BlockNone));
        let json = serde_json::to_value(s.safety_settings[0]).unwrap();
        assert_eq!(json["category"], "HARM_CATEGORY_HARASSMENT");
        assert_eq!(json["threshold"], "BLOCK_NONE");
    }
}
