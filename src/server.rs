//! HTTP surface: `POST /api/analyze` and `GET /api/health`.
//!
//! The handler reads a multipart form (`file`, `text`, `language`), turns it
//! into an [`AnalysisRequest`], and runs it through the shared [`Analyzer`]
//! under a whole-request timeout. Every failure becomes a JSON body of the
//! form `{"error": "...", "kind": "..."}`.

use crate::analyze::Analyzer;
use crate::config::ServerConfig;
use crate::error::{ErrorKind, StudyGuardianError, MALFORMED_RESPONSE_MESSAGE};
use crate::output::{AnalysisResult, ErrorResponse};
use crate::pipeline::input::{AnalysisRequest, UploadedFile};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        DefaultBodyLimit, Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Room for multipart boundaries and the text fields on top of the file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
    request_timeout: Duration,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>, request_timeout_secs: u64) -> Self {
        Self {
            analyzer,
            request_timeout: Duration::from_secs(request_timeout_secs),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.analyzer.config().max_upload_bytes + FORM_OVERHEAD_BYTES;
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/api/health", get(health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: ServerConfig, analyzer: Arc<Analyzer>) -> Result<(), StudyGuardianError> {
    let listener = TcpListener::bind(config.bind_addr).await.map_err(|e| {
        StudyGuardianError::Internal(format!("failed to bind {}: {}", config.bind_addr, e))
    })?;
    serve_with_shutdown(listener, config, analyzer, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    config: ServerConfig,
    analyzer: Arc<Analyzer>,
    shutdown: F,
) -> Result<(), StudyGuardianError>
where
    F: Future<Output = ()> + Send + 'static,
{
    if analyzer.key_count() == 0 {
        warn!("Serving without an API key; /api/analyze will fail until one is configured");
    }
    let addr = listener
        .local_addr()
        .map_err(|e| StudyGuardianError::Internal(format!("listener address: {e}")))?;
    info!(
        "Listening on http://{} (models: {})",
        addr,
        analyzer.config().models.join(", ")
    );

    let app = router(AppState::new(analyzer, config.request_timeout_secs));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| StudyGuardianError::Internal(format!("server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn analyze(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let start = Instant::now();
    let max_bytes = state.analyzer.config().max_upload_bytes;

    let multipart = multipart.map_err(|e| {
        StudyGuardianError::InvalidInput(format!("Invalid form data: {}", e.body_text()))
    })?;
    let form = read_form(multipart, max_bytes).await?;
    let request = AnalysisRequest::from_form(
        form.file,
        form.text,
        form.language.as_deref(),
        max_bytes,
    )?;

    let secs = state.request_timeout.as_secs();
    let result = tokio::time::timeout(state.request_timeout, state.analyzer.analyze(&request))
        .await
        .map_err(|_| StudyGuardianError::RequestTimeout { secs })??;

    info!(
        "Analyzed with {} in {}ms",
        result.used_model,
        start.elapsed().as_millis()
    );
    Ok(Json(result))
}

/// Service liveness plus the candidate list and how many keys are loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub models: Vec<String>,
    pub keys_configured: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        models: state.analyzer.config().models.clone(),
        keys_configured: state.analyzer.key_count(),
    })
}

// ── Form parsing ─────────────────────────────────────────────────────────

#[derive(Default)]
struct FormFields {
    file: Option<UploadedFile>,
    text: Option<String>,
    language: Option<String>,
}

async fn read_form(mut multipart: Multipart, max_bytes: usize) -> Result<FormFields, StudyGuardianError> {
    let form_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            StudyGuardianError::PayloadTooLarge { limit: max_bytes }
        } else {
            StudyGuardianError::InvalidInput(format!("Invalid form data: {}", e.body_text()))
        }
    };

    let mut form = FormFields::default();
    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(form_error)?.to_vec();
                debug!(
                    "Form file {:?} ({:?}, {} bytes)",
                    file_name,
                    content_type,
                    data.len()
                );
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            "text" => form.text = Some(field.text().await.map_err(form_error)?),
            "language" => form.language = Some(field.text().await.map_err(form_error)?),
            other => debug!("Ignoring form field '{}'", other),
        }
    }
    Ok(form)
}

// ── Errors ───────────────────────────────────────────────────────────────

/// A [`StudyGuardianError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub StudyGuardianError);

impl From<StudyGuardianError> for ApiError {
    fn from(err: StudyGuardianError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    /// Status code and client-facing message.
    fn status_and_message(&self) -> (StatusCode, String) {
        match &self.0 {
            StudyGuardianError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            e @ StudyGuardianError::PayloadTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
            }
            e @ StudyGuardianError::RequestTimeout { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, e.to_string())
            }
            StudyGuardianError::MalformedResponse { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                MALFORMED_RESPONSE_MESSAGE.to_string(),
            ),
            e => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Internal Server Error: {e}"),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        let kind: ErrorKind = self.0.kind();
        if status.is_server_error() {
            error!("Analysis failed ({}): {}", kind, self.0);
        } else {
            warn!("Rejected request ({}): {}", kind, message);
        }

        let body = ErrorResponse {
            error: message,
            kind: Some(kind),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttemptError;

    fn status_of(err: StudyGuardianError) -> (StatusCode, String) {
        ApiError(err).status_and_message()
    }

    #[test]
    fn input_errors_are_400_with_raw_message() {
        let (status, msg) = status_of(StudyGuardianError::InvalidInput(
            "Please provide either a file or text content.".into(),
        ));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "Please provide either a file or text content.");
    }

    #[test]
    fn upstream_errors_are_prefixed() {
        let (status, msg) = status_of(StudyGuardianError::UpstreamFailure {
            attempts: 2,
            first_error: AttemptError::RateLimited {
                model: "gemini-2.5-flash".into(),
                message: "quota".into(),
            },
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(msg.starts_with("Internal Server Error: "), "got: {msg}");
        assert!(msg.contains("429"), "got: {msg}");
    }

    #[test]
    fn malformed_reply_uses_fixed_message() {
        let (status, msg) = status_of(StudyGuardianError::MalformedResponse {
            model: "m".into(),
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, MALFORMED_RESPONSE_MESSAGE);
    }

    #[test]
    fn size_and_timeout_statuses() {
        assert_eq!(
            status_of(StudyGuardianError::PayloadTooLarge { limit: 10 }).0,
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            status_of(StudyGuardianError::RequestTimeout { secs: 60 }).0,
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
