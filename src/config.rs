//! Configuration types for study-guide analysis.
//!
//! Everything the pipeline needs to know lives in [`AnalyzerConfig`], built
//! via [`AnalyzerConfigBuilder`] or read from the environment with
//! [`AnalyzerConfig::from_env`]. The HTTP listener has its own small
//! [`ServerConfig`] because the CLI can run analyses without a server.

use crate::error::StudyGuardianError;
use crate::pipeline::invoke::HarmBlockThreshold;
use std::fmt;
use std::net::SocketAddr;
use tracing::warn;

/// Default Gemini REST endpoint (v1beta exposes `responseMimeType`).
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default candidate model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Inline data ceiling of the `generateContent` API.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Configuration for an analysis.
///
/// # Example
/// ```rust
/// use study_guardian::AnalyzerConfig;
///
/// let config = AnalyzerConfig::builder()
///     .models(["gemini-2.5-flash", "gemini-2.0-flash"])
///     .api_key("test-key")
///     .temperature(0.7)
///     .build()
///     .unwrap();
/// assert_eq!(config.models.len(), 2);
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// Candidate model identifiers, tried in order. Default: `["gemini-2.5-flash"]`.
    pub models: Vec<String>,

    /// API credentials rotated round-robin, one per analysis.
    ///
    /// May be empty: the service still starts, but every analysis fails
    /// with [`StudyGuardianError::ProviderNotConfigured`].
    pub api_keys: Vec<String>,

    /// Base URL of the generative-content API. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Sampling temperature, clamped to 0.0–2.0. Default: 0.7.
    pub temperature: f32,

    /// Threshold applied to every harm category. Default: `BlockNone`.
    pub safety_threshold: HarmBlockThreshold,

    /// Per-call timeout for one candidate, in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Largest accepted upload in bytes. Default: 20 MiB.
    pub max_upload_bytes: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            models: vec![DEFAULT_MODEL.to_string()],
            api_keys: Vec::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            safety_threshold: HarmBlockThreshold::default(),
            api_timeout_secs: 60,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("models", &self.models)
            .field("api_keys", &format_args!("<{} redacted>", self.api_keys.len()))
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("safety_threshold", &self.safety_threshold)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read credentials, models and endpoint from the process environment.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `GEMINI_API_KEY` | primary key |
    /// | `GEMINI_API_KEY_BACKUP` | backup key, rotated with the primary |
    /// | `GEMINI_API_KEYS` | extra keys, comma-separated |
    /// | `STUDY_GUARDIAN_MODELS` | candidate models, comma-separated |
    /// | `GEMINI_BASE_URL` | API endpoint override |
    ///
    /// A missing key is not an error here; it is logged and every later
    /// request fails instead.
    pub fn from_env() -> Result<Self, StudyGuardianError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StudyGuardianError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut keys = Vec::new();
        for name in ["GEMINI_API_KEY", "GEMINI_API_KEY_BACKUP"] {
            if let Some(v) = lookup(name) {
                keys.push(v);
            }
        }
        if let Some(list) = lookup("GEMINI_API_KEYS") {
            keys.extend(split_list(&list));
        }

        let mut builder = Self::builder().api_keys(keys);
        if let Some(models) = lookup("STUDY_GUARDIAN_MODELS") {
            let models = split_list(&models);
            if !models.is_empty() {
                builder = builder.models(models);
            }
        }
        if let Some(url) = lookup("GEMINI_BASE_URL").filter(|u| !u.trim().is_empty()) {
            builder = builder.base_url(url);
        }

        let config = builder.build()?;
        if config.api_keys.is_empty() {
            warn!("No valid GEMINI_API_KEY found; analysis requests will fail until one is set");
        }
        Ok(config)
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models.into_iter().map(Into::into).collect();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_keys.push(key.into());
        self
    }

    pub fn api_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.api_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn safety_threshold(mut self, threshold: HarmBlockThreshold) -> Self {
        self.config.safety_threshold = threshold;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Blank and duplicate keys and models are dropped, keeping first-seen order.
    pub fn build(mut self) -> Result<AnalyzerConfig, StudyGuardianError> {
        self.config.models = dedup_non_empty(self.config.models);
        self.config.api_keys = dedup_non_empty(self.config.api_keys);
        self.config.base_url = self.config.base_url.trim().trim_end_matches('/').to_string();

        let c = &self.config;
        if c.models.is_empty() {
            return Err(StudyGuardianError::InvalidConfig(
                "at least one candidate model is required".into(),
            ));
        }
        if c.base_url.is_empty() {
            return Err(StudyGuardianError::InvalidConfig("base URL must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(StudyGuardianError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(StudyGuardianError::InvalidConfig(
                "upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Settings for the HTTP listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind. Default: `127.0.0.1:3000`.
    pub bind_addr: SocketAddr,

    /// Ceiling on one `/api/analyze` request, in seconds. Default: 60.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            request_timeout_secs: 60,
        }
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn dedup_non_empty(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim().to_string();
        if !item.is_empty() && !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let c = AnalyzerConfig::default();
        assert_eq!(c.models, vec!["gemini-2.5-flash"]);
        assert_eq!(c.temperature, 0.7);
        assert_eq!(c.safety_threshold, HarmBlockThreshold::BlockNone);
        assert_eq!(c.api_timeout_secs, 60);
    }

    #[test]
    fn env_collects_primary_backup_and_list() {
        let c = AnalyzerConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "k1"),
            ("GEMINI_API_KEY_BACKUP", ""),
            ("GEMINI_API_KEYS", "k2, k1 ,k3"),
            ("STUDY_GUARDIAN_MODELS", "gemini-2.5-flash,gemini-2.0-flash"),
        ]))
        .unwrap();
        assert_eq!(c.api_keys, vec!["k1", "k2", "k3"]);
        assert_eq!(c.models, vec!["gemini-2.5-flash", "gemini-2.0-flash"]);
    }

    #[test]
    fn missing_keys_are_tolerated() {
        let c = AnalyzerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(c.api_keys.is_empty());
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn empty_model_list_rejected() {
        let err = AnalyzerConfig::builder().models(["", "  "]).build().unwrap_err();
        assert!(err.to_string().contains("model"));
    }

    #[test]
    fn debug_redacts_keys() {
        let c = AnalyzerConfig::builder().api_key("secret-key").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("1 redacted"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let c = AnalyzerConfig::builder()
            .base_url("http://localhost:9999/v1beta/")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://localhost:9999/v1beta");
    }
}
