//! Error types for the study-guardian library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`StudyGuardianError`] is **fatal**: the analysis cannot produce a study
//!   guide (no input, unsupported file, every candidate model failed, the
//!   model answered with something that is not JSON). Returned as
//!   `Err(StudyGuardianError)` from [`crate::analyze::Analyzer::analyze`].
//!
//! * [`AttemptError`] is **non-fatal**: one candidate model failed. The
//!   invoker records it and moves on to the next candidate; only the first
//!   one survives, inside [`StudyGuardianError::UpstreamFailure`].
//!
//! [`ErrorKind`] is the structured view of either, shared by the HTTP layer
//! (it is serialised into every error body) and by clients that want to show
//! friendlier text than the raw upstream message.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Message returned to callers when the model reply is not a JSON object.
pub const MALFORMED_RESPONSE_MESSAGE: &str = "AI response was not in valid JSON format.";

/// Message used when no candidate produced an error worth surfacing.
pub const NO_RESPONSE_MESSAGE: &str = "AI model failed to respond.";

/// All fatal errors returned by the study-guardian library.
#[derive(Debug, Error)]
pub enum StudyGuardianError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Neither a file nor text was supplied, or the file type is unsupported.
    #[error("{0}")]
    InvalidInput(String),

    /// The uploaded file exceeds the configured inline-data ceiling.
    #[error("File is too large (limit {limit} bytes)")]
    PayloadTooLarge { limit: usize },

    // ── Upstream errors ───────────────────────────────────────────────────
    /// No API key is configured; every request fails at call time.
    #[error("Gemini API key is not configured.\nSet GEMINI_API_KEY (and optionally GEMINI_API_KEY_BACKUP).")]
    ProviderNotConfigured,

    /// Every candidate model failed. Carries the first captured error.
    #[error("{first_error}")]
    UpstreamFailure {
        attempts: usize,
        first_error: AttemptError,
    },

    /// There were no candidate models to try.
    #[error("AI model failed to respond.")]
    NoCandidates,

    /// The model answered, but the text is not a JSON object.
    #[error("AI response was not in valid JSON format.")]
    MalformedResponse { model: String },

    /// The whole analysis exceeded the request-duration ceiling.
    #[error("Analysis timed out after {secs}s")]
    RequestTimeout { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading or writing the local result cache failed.
    #[error("Cache I/O failed for '{path}': {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the exported study guide.
    #[error("Failed to write study guide '{path}': {source}")]
    ExportFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyGuardianError {
    /// Classify this error into a client-facing [`ErrorKind`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            StudyGuardianError::InvalidInput(_) => ErrorKind::InvalidInput,
            StudyGuardianError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            StudyGuardianError::UpstreamFailure { first_error, .. } => first_error.kind(),
            StudyGuardianError::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            StudyGuardianError::RequestTimeout { .. } => ErrorKind::Timeout,
            StudyGuardianError::ProviderNotConfigured | StudyGuardianError::NoCandidates => {
                ErrorKind::UpstreamFailure
            }
            StudyGuardianError::InvalidConfig(_)
            | StudyGuardianError::CacheIo { .. }
            | StudyGuardianError::ExportFailed { .. }
            | StudyGuardianError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal failure of a single candidate model.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AttemptError {
    /// The request never produced an HTTP response.
    #[error("[{model}] transport error: {detail}")]
    Transport { model: String, detail: String },

    /// The call exceeded the per-call timeout.
    #[error("[{model}] request timed out after {secs}s")]
    Timeout { model: String, secs: u64 },

    /// HTTP 429 from the API.
    #[error("[{model}] [429 Too Many Requests] {message}")]
    RateLimited { model: String, message: String },

    /// Any other non-success status.
    #[error("[{model}] [{status}] {message}")]
    Status {
        model: String,
        status: u16,
        message: String,
    },

    /// The prompt or the candidate was blocked, or no candidate came back.
    #[error("[{model}] response blocked: {reason}")]
    Blocked { model: String, reason: String },

    /// A candidate came back with no text at all.
    #[error("[{model}] model returned an empty response")]
    EmptyResponse { model: String },
}

impl AttemptError {
    /// Model identifier the attempt was made with.
    pub fn model(&self) -> &str {
        match self {
            AttemptError::Transport { model, .. }
            | AttemptError::Timeout { model, .. }
            | AttemptError::RateLimited { model, .. }
            | AttemptError::Status { model, .. }
            | AttemptError::Blocked { model, .. }
            | AttemptError::EmptyResponse { model } => model,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AttemptError::RateLimited { .. } => ErrorKind::RateLimited,
            AttemptError::Timeout { .. } => ErrorKind::Timeout,
            AttemptError::Status {
                status: 400,
                message,
                ..
            } if mentions_document(message) => ErrorKind::UnreadableDocument,
            _ => ErrorKind::UpstreamFailure,
        }
    }
}

fn mentions_document(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("pdf") || lower.contains("document")
}

/// Structured error category carried in every error response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    PayloadTooLarge,
    RateLimited,
    UnreadableDocument,
    UpstreamFailure,
    MalformedResponse,
    Timeout,
    Internal,
}

impl ErrorKind {
    /// Best-effort classification of a bare error message.
    ///
    /// Used for error bodies that carry no `kind` (older servers, proxies).
    /// Rate limiting is checked before the PDF hint, and the PDF hint wins
    /// when both appear, matching the order the checks were always applied in.
    pub fn from_message(message: &str) -> Option<ErrorKind> {
        let mut kind = None;
        if message.contains("429") {
            kind = Some(ErrorKind::RateLimited);
        }
        if message.contains("pdf") {
            kind = Some(ErrorKind::UnreadableDocument);
        }
        kind
    }

    /// Text suitable for showing to an end user, if this kind has one.
    pub fn friendly_message(self) -> Option<&'static str> {
        match self {
            ErrorKind::RateLimited => {
                Some("Usage limit exceeded. Please wait a moment and try again.")
            }
            ErrorKind::UnreadableDocument => {
                Some("Could not read the PDF. Ensure it's not encrypted or corrupted.")
            }
            ErrorKind::PayloadTooLarge => {
                Some("The file is too large. Please upload a smaller PDF or image.")
            }
            ErrorKind::Timeout => Some("The analysis took too long. Please try a shorter document."),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::UnreadableDocument => "unreadable_document",
            ErrorKind::UpstreamFailure => "upstream_failure",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}
