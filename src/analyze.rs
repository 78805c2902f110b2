//! Analysis entry points.
//!
//! [`Analyzer`] owns everything that outlives a single request: the config,
//! the key ring with its rotation counter, and the generation backend. It is
//! cheap to share behind an `Arc` across server tasks.

use crate::config::AnalyzerConfig;
use crate::error::StudyGuardianError;
use crate::gemini::GeminiClient;
use crate::keys::KeyRing;
use crate::output::AnalysisResult;
use crate::pipeline::input::AnalysisRequest;
use crate::pipeline::invoke::{self, ContentGenerator, GenerationSettings};
use crate::pipeline::{assemble, validate};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Runs analyses against a configured generation backend.
pub struct Analyzer {
    config: AnalyzerConfig,
    keys: KeyRing,
    settings: GenerationSettings,
    generator: Arc<dyn ContentGenerator>,
}

impl Analyzer {
    /// Analyzer backed by the Gemini REST API.
    pub fn new(config: AnalyzerConfig) -> Result<Self, StudyGuardianError> {
        let client = GeminiClient::new(config.base_url.clone(), config.api_timeout_secs)
            .map_err(|e| StudyGuardianError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self::with_generator(config, Arc::new(client)))
    }

    /// Analyzer backed by any [`ContentGenerator`].
    pub fn with_generator(config: AnalyzerConfig, generator: Arc<dyn ContentGenerator>) -> Self {
        let keys = KeyRing::new(config.api_keys.clone());
        let settings = GenerationSettings::from_config(&config);
        Self {
            config,
            keys,
            settings,
            generator,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Number of configured API keys.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Produce a study guide for a validated request.
    ///
    /// # Errors
    /// - [`StudyGuardianError::ProviderNotConfigured`]: no API key
    /// - [`StudyGuardianError::UpstreamFailure`]: every candidate failed
    /// - [`StudyGuardianError::MalformedResponse`]: the reply was not JSON
    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, StudyGuardianError> {
        let start = Instant::now();
        info!(
            "Starting analysis ({} output, {:?})",
            request.language, request.content
        );

        let generation = assemble::assemble(request);
        debug!("Assembled {} parts", generation.parts.len());

        let invocation = invoke::invoke(
            self.generator.as_ref(),
            &self.keys,
            &self.config.models,
            &generation,
            &self.settings,
        )
        .await?;

        let result = validate::parse_response(&invocation.text, &invocation.model)?;

        info!(
            "Analysis complete with {} after {} attempt(s), {}ms",
            invocation.model,
            invocation.attempts,
            start.elapsed().as_millis()
        );
        Ok(result)
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .field("generator", &"<dyn ContentGenerator>")
            .finish()
    }
}
