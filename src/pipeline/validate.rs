//! Response validation: model text → [`AnalysisResult`].
//!
//! The model is asked for `application/json`, but the reply is still just
//! text. This stage checks that it parses to a JSON object and normalises
//! each field once, here at the boundary, so nothing downstream needs to
//! care whether `examQuestions` came back as an array, a numbered string or
//! not at all.
//!
//! A reply that does not parse collapses into one fixed error; the raw text
//! is logged for operators and never returned to the caller.

use crate::error::StudyGuardianError;
use crate::output::AnalysisResult;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, error};

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\r?\n?(.*?)\r?\n?```\s*$").unwrap());

static RE_LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*•])\s+").unwrap());

/// Parse and normalise the raw model text.
///
/// # Errors
/// [`StudyGuardianError::MalformedResponse`] when the text is not a JSON
/// object (after removing one optional outer code fence).
pub fn parse_response(raw: &str, used_model: &str) -> Result<AnalysisResult, StudyGuardianError> {
    let body = strip_json_fences(raw);

    let object = match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            error!(
                "Model {} returned JSON that is not an object ({}): {}",
                used_model,
                json_type(&other),
                raw
            );
            return Err(StudyGuardianError::MalformedResponse {
                model: used_model.to_string(),
            });
        }
        Err(e) => {
            error!("Failed to parse {} JSON ({}): {}", used_model, e, raw);
            return Err(StudyGuardianError::MalformedResponse {
                model: used_model.to_string(),
            });
        }
    };

    let result = normalise(&object, used_model);
    debug!(
        "Parsed study guide: {} summary words, {} questions",
        result.summary_word_count(),
        result.exam_questions.len()
    );
    Ok(result)
}

/// Remove a leading BOM and a single outer ```` ``` ```` / ```` ```json ```` fence.
fn strip_json_fences(input: &str) -> &str {
    let trimmed = input.trim_start_matches('\u{feff}').trim();
    match RE_OUTER_FENCES.captures(trimmed).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => trimmed,
    }
}

fn normalise(object: &Map<String, Value>, used_model: &str) -> AnalysisResult {
    AnalysisResult {
        summary: text_field(object.get("summary")),
        exam_questions: questions_field(object.get("examQuestions")),
        explanation: text_field(object.get("explanation")),
        study_plan: text_field(object.get("studyPlan")),
        used_model: used_model.to_string(),
    }
}

fn text_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn questions_field(value: Option<&Value>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|q| !q.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .lines()
            .map(|line| RE_LIST_MARKER.replace(line, "").trim().to_string())
            .filter(|q| !q.is_empty())
            .collect(),
        Some(other) => vec![other.to_string()],
    }
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
