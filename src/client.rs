//! Client for a running study-guardian server.
//!
//! Sends the same multipart form a browser would and maps error bodies to
//! [`RemoteError::Api`], whose display text is the friendly message for the
//! error kind when there is one.

use crate::error::ErrorKind;
use crate::output::{AnalysisResult, ErrorResponse};
use crate::pipeline::input::{AnalysisRequest, DocumentContent};
use crate::server::HealthResponse;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure talking to a remote server.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The server could not be reached or the connection dropped.
    #[error("Could not reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an error body.
    #[error("{}", .body.display_message())]
    Api { status: u16, body: ErrorResponse },

    /// The request could not be built, so nothing was sent.
    #[error("Invalid request: {detail}")]
    InvalidRequest { detail: String },

    /// A 2xx response whose body was not what was expected.
    #[error("Unexpected response from {url}: {detail}")]
    Decode { url: String, detail: String },
}

impl RemoteError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            RemoteError::Api { body, .. } => body.effective_kind(),
            RemoteError::Transport { source, .. } if source.is_timeout() => Some(ErrorKind::Timeout),
            _ => None,
        }
    }
}

/// HTTP client for `/api/analyze` and `/api/health`.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Submit a request and wait for the study guide.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, RemoteError> {
        let url = format!("{}/api/analyze", self.base_url);
        let form = build_form(request)?;

        debug!("POST {}", url);
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.clone(),
                source,
            })?;
        decode(&url, response).await
    }

    pub async fn health(&self) -> Result<HealthResponse, RemoteError> {
        let url = format!("{}/api/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| RemoteError::Transport {
                url: url.clone(),
                source,
            })?;
        decode(&url, response).await
    }
}

fn build_form(request: &AnalysisRequest) -> Result<Form, RemoteError> {
    let form = Form::new().text("language", request.language.as_str());
    let form = match &request.content {
        DocumentContent::Inline {
            mime_type,
            data,
            file_name,
        } => {
            let part = Part::bytes(data.clone())
                .file_name(file_name.clone().unwrap_or_else(|| "upload".to_string()))
                .mime_str(mime_type)
                .map_err(|e| RemoteError::InvalidRequest {
                    detail: format!("mime type '{mime_type}': {e}"),
                })?;
            form.part("file", part)
        }
        DocumentContent::Text(text) => form.text("text", text.clone()),
    };
    Ok(form)
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    let body = response.text().await.map_err(|source| RemoteError::Transport {
        url: url.to_string(),
        source,
    })?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| RemoteError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        });
    }

    let body = serde_json::from_str::<ErrorResponse>(&body).unwrap_or_else(|_| ErrorResponse {
        error: if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            body.trim().to_string()
        },
        kind: None,
    });
    Err(RemoteError::Api {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_displays_friendly_text() {
        let e = RemoteError::Api {
            status: 500,
            body: ErrorResponse {
                error: "Internal Server Error: [gemini-2.5-flash] [400] Unable to process input pdf".into(),
                kind: Some(ErrorKind::UnreadableDocument),
            },
        };
        assert_eq!(
            e.to_string(),
            "Could not read the PDF. Ensure it's not encrypted or corrupted."
        );
        assert_eq!(e.kind(), Some(ErrorKind::UnreadableDocument));
    }

    #[test]
    fn api_error_without_friendly_text_shows_raw_message() {
        let e = RemoteError::Api {
            status: 400,
            body: ErrorResponse {
                error: "Please provide either a file or text content.".into(),
                kind: Some(ErrorKind::InvalidInput),
            },
        };
        assert_eq!(e.to_string(), "Please provide either a file or text content.");
    }

    #[tokio::test]
    async fn bad_mime_type_fails_before_sending() {
        // Nothing listens here; the error must come from building the form.
        let client = RemoteClient::new("http://127.0.0.1:9", 5).unwrap();
        let request = AnalysisRequest {
            content: DocumentContent::Inline {
                mime_type: "not a mime type".into(),
                data: b"%PDF-1.4".to_vec(),
                file_name: Some("notes.pdf".into()),
            },
            language: crate::pipeline::input::Language::English,
        };

        let err = client.analyze(&request).await.unwrap_err();
        assert!(matches!(err, RemoteError::InvalidRequest { .. }), "got {err:?}");
        assert!(err.to_string().contains("not a mime type"));
        assert_eq!(err.kind(), None);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let c = RemoteClient::new("http://localhost:3000/", 5).unwrap();
        assert_eq!(c.base_url, "http://localhost:3000");
    }
}
