//! Output types returned by an analysis.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};

/// A generated study guide.
///
/// Serialised with the camelCase keys clients expect:
/// `summary`, `examQuestions`, `explanation`, `studyPlan`, `usedModel`.
/// Text fields are Markdown. Fields the model left out are empty rather than
/// absent, so every consumer sees the same shape.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub summary: String,
    pub exam_questions: Vec<String>,
    pub explanation: String,
    pub study_plan: String,
    pub used_model: String,
}

impl AnalysisResult {
    /// Whitespace-separated word count of the summary.
    pub fn summary_word_count(&self) -> usize {
        self.summary.split_whitespace().count()
    }

    /// Whitespace-separated word count of the explanation.
    pub fn explanation_word_count(&self) -> usize {
        self.explanation.split_whitespace().count()
    }
}

/// Body of every non-2xx `/api/analyze` response.
///
/// `kind` is optional on the way in so bodies from older servers, which only
/// carried `error`, still parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl ErrorResponse {
    /// Kind from the body, or classified from the message text.
    pub fn effective_kind(&self) -> Option<ErrorKind> {
        self.kind.or_else(|| ErrorKind::from_message(&self.error))
    }

    /// Friendly text where one exists, the raw message otherwise.
    pub fn display_message(&self) -> String {
        self.effective_kind()
            .and_then(ErrorKind::friendly_message)
            .map(str::to_string)
            .unwrap_or_else(|| self.error.clone())
    }
}
