//! Input resolution: normalise user-supplied form fields into a request.
//!
//! All rejection happens here, before any prompt is built or any network
//! call is made: no content, an unsupported media type, an empty or
//! oversized file. Downstream stages can then assume exactly one content
//! variant with a supported mime type.

use crate::error::StudyGuardianError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Error text for a request with neither a file nor text.
pub const MISSING_CONTENT_MESSAGE: &str = "Please provide either a file or text content.";

/// Error text for a file that is neither a PDF nor an image.
pub const UNSUPPORTED_TYPE_MESSAGE: &str = "Unsupported file type. Please upload a PDF or Image.";

/// Output language of the study guide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    Arabic,
}

impl Language {
    /// Lenient parse: `arabic` in any case selects Arabic, anything else English.
    pub fn parse_lenient(s: &str) -> Language {
        if s.trim().eq_ignore_ascii_case("arabic") {
            Language::Arabic
        } else {
            Language::English
        }
    }

    /// Name used inside the instruction block.
    pub fn prompt_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Arabic => "Arabic (العربية)",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Arabic => "arabic",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse, used for stored preferences and CLI flags.
impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "english" | "en" => Ok(Language::English),
            "arabic" | "ar" => Ok(Language::Arabic),
            other => Err(format!("unknown language '{other}' (expected english or arabic)")),
        }
    }
}

/// The material to analyse. Exactly one variant per request.
#[derive(Clone, PartialEq, Eq)]
pub enum DocumentContent {
    /// A PDF or image, sent to the model as inline data.
    Inline {
        mime_type: String,
        data: Vec<u8>,
        file_name: Option<String>,
    },
    /// Pasted text, appended after the instruction block.
    Text(String),
}

impl fmt::Debug for DocumentContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentContent::Inline {
                mime_type,
                data,
                file_name,
            } => f
                .debug_struct("Inline")
                .field("mime_type", mime_type)
                .field("bytes", &data.len())
                .field("file_name", file_name)
                .finish(),
            DocumentContent::Text(t) => f.debug_tuple("Text").field(&t.len()).finish(),
        }
    }
}

/// A file received from a form or read from disk, before validation.
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    /// Browsers send an unnamed, empty part when the picker was left empty.
    fn is_placeholder(&self) -> bool {
        self.data.is_empty() && self.file_name.as_deref().map_or(true, str::is_empty)
    }
}

/// A validated analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub content: DocumentContent,
    pub language: Language,
}

impl AnalysisRequest {
    /// Request for pasted text.
    pub fn text(text: impl Into<String>, language: Language) -> Result<Self, StudyGuardianError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(StudyGuardianError::InvalidInput(MISSING_CONTENT_MESSAGE.into()));
        }
        Ok(Self {
            content: DocumentContent::Text(text),
            language,
        })
    }

    /// Request for a document with a known mime type.
    pub fn document(
        data: Vec<u8>,
        mime_type: &str,
        file_name: Option<String>,
        language: Language,
        max_bytes: usize,
    ) -> Result<Self, StudyGuardianError> {
        let mime_type = normalise_mime(mime_type);
        if !is_supported_mime(&mime_type) {
            return Err(StudyGuardianError::InvalidInput(UNSUPPORTED_TYPE_MESSAGE.into()));
        }
        if data.is_empty() {
            return Err(StudyGuardianError::InvalidInput(
                "The uploaded file is empty.".into(),
            ));
        }
        if data.len() > max_bytes {
            debug!("Rejected upload of {} bytes", data.len());
            return Err(StudyGuardianError::PayloadTooLarge { limit: max_bytes });
        }
        debug!("Accepted {} upload: {} bytes", mime_type, data.len());
        Ok(Self {
            content: DocumentContent::Inline {
                mime_type,
                data,
                file_name,
            },
            language,
        })
    }

    /// Build a request from raw form fields.
    ///
    /// The file wins when both a file and text are present. Blank text and
    /// placeholder file parts count as absent.
    pub fn from_form(
        file: Option<UploadedFile>,
        text: Option<String>,
        language: Option<&str>,
        max_bytes: usize,
    ) -> Result<Self, StudyGuardianError> {
        let language = language.map(Language::parse_lenient).unwrap_or_default();
        let file = file.filter(|f| !f.is_placeholder());
        let text = text.filter(|t| !t.trim().is_empty());

        match (file, text) {
            (Some(file), _) => {
                let mime = file.content_type.clone().unwrap_or_default();
                Self::document(file.data, &mime, file.file_name, language, max_bytes)
            }
            (None, Some(text)) => Self::text(text, language),
            (None, None) => Err(StudyGuardianError::InvalidInput(MISSING_CONTENT_MESSAGE.into())),
        }
    }

    /// Read a local file, guessing its mime type from the extension.
    pub async fn from_path(
        path: &Path,
        language: Language,
        max_bytes: usize,
    ) -> Result<Self, StudyGuardianError> {
        let mime = mime_from_extension(path).ok_or_else(|| {
            StudyGuardianError::InvalidInput(UNSUPPORTED_TYPE_MESSAGE.into())
        })?;
        let data = tokio::fs::read(path).await.map_err(|e| {
            StudyGuardianError::InvalidInput(format!(
                "Could not read '{}': {}",
                path.display(),
                e
            ))
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        Self::document(data, mime, file_name, language, max_bytes)
    }
}

/// Drop mime parameters, trim and lowercase.
pub fn normalise_mime(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Only PDFs and images are forwarded to the model.
pub fn is_supported_mime(mime: &str) -> bool {
    mime == "application/pdf" || mime.starts_with("image/")
}

/// Mime type for a local path, by extension.
pub fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        _ => return None,
    };
    Some(mime)
}
