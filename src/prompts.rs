//! Prompt template for study-guide generation.
//!
//! Every request starts with the same instruction block; only the output
//! language changes. Keeping it here lets tests inspect the exact wording
//! and keeps prompt edits out of the invoker.

use crate::pipeline::input::Language;

/// Maximum words requested for the summary.
pub const SUMMARY_WORD_LIMIT: usize = 300;

/// Maximum words requested for the explanation.
pub const EXPLANATION_WORD_LIMIT: usize = 150;

/// Number of exam questions requested.
pub const EXAM_QUESTION_COUNT: usize = 5;

/// Delimiter placed before pasted text so the model can tell instructions
/// from material.
pub const CONTENT_MARKER: &str = "\n\n[CONTENT TO ANALYZE]:\n";

/// Build the instruction block for the given output language.
pub fn instruction_block(language: Language) -> String {
    format!(
        r#"
ROLE: You are an efficient academic tutor. Your goal is to provide a QUICK, HIGH-IMPACT study summary.

TASK: Analyze the lecture content and output a CONCISE study guide.

LANGUAGE: {language}.

CONSTRAINTS:
- Keep the summary UNDER {summary} words. Focus ONLY on the main ideas.
- Keep the explanation UNDER {explanation} words.
- Write exactly {questions} exam questions.
- Be direct and to the point. Speed is key.

OUTPUT FORMAT: Return ONLY a raw JSON object.
JSON Structure:
{{
  "summary": "Concise markdown string. Use bullet points for speed reading. Max {summary} words.",
  "examQuestions": [
    "Question 1 (Direct & Clear)",
    "Question 2",
    "Question 3",
    "Question 4",
    "Question 5"
  ],
  "explanation": "Brief, simple info using the 'Feynman Technique'. Max {explanation} words.",
  "studyPlan": "Short, actionable 3-day checklist (Markdown)."
}}
"#,
        language = language.prompt_name(),
        summary = SUMMARY_WORD_LIMIT,
        explanation = EXPLANATION_WORD_LIMIT,
        questions = EXAM_QUESTION_COUNT,
    )
}

/// Wrap pasted text in the content delimiter.
pub fn text_content(text: &str) -> String {
    format!("{CONTENT_MARKER}{text}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_block_carries_limits_and_schema() {
        let block = instruction_block(Language::English);
        assert!(block.contains("LANGUAGE: English."));
        assert!(block.contains("UNDER 300 words"));
        assert!(block.contains("UNDER 150 words"));
        for key in ["\"summary\"", "\"examQuestions\"", "\"explanation\"", "\"studyPlan\""] {
            assert!(block.contains(key), "missing {key}");
        }
        assert!(block.contains("raw JSON object"));
    }

    #[test]
    fn arabic_block_names_arabic() {
        let block = instruction_block(Language::Arabic);
        assert!(block.contains("Arabic (العربية)"));
        assert!(!block.contains("LANGUAGE: English"));
    }

    #[test]
    fn text_content_is_delimited() {
        let part = text_content("Mitosis is cell division.");
        assert!(part.starts_with("\n\n[CONTENT TO ANALYZE]:\n"));
        assert!(part.ends_with("Mitosis is cell division."));
    }
}
