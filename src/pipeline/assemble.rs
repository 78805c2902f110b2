//! Request assembly: instruction block plus the material to analyse.
//!
//! ## Part Layout
//!
//! A single user turn carrying, in order:
//! 1. **Text part**: the instruction block for the requested language
//! 2. **Inline data part** *(documents)*: base64 payload with its mime type
//!    or **Text part** *(pasted text)*: the text behind a delimiter
//!
//! Assembly is pure: it never touches the network or the file system.

use crate::pipeline::encode;
use crate::pipeline::input::{AnalysisRequest, DocumentContent};
use crate::prompts::{instruction_block, text_content};

/// One fragment of the request content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: String },
}

/// A provider-neutral generation request: the ordered parts of one user turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationRequest {
    pub parts: Vec<ContentPart>,
}

impl GenerationRequest {
    /// Total characters of text and base64 payload, for logging.
    pub fn payload_len(&self) -> usize {
        self.parts
            .iter()
            .map(|p| match p {
                ContentPart::Text(t) => t.len(),
                ContentPart::InlineData { data, .. } => data.len(),
            })
            .sum()
    }
}

/// Build the generation request for a validated analysis request.
pub fn assemble(request: &AnalysisRequest) -> GenerationRequest {
    let mut parts = vec![ContentPart::Text(instruction_block(request.language))];

    match &request.content {
        DocumentContent::Inline {
            mime_type, data, ..
        } => parts.push(encode::inline_part(data, mime_type)),
        DocumentContent::Text(text) => parts.push(ContentPart::Text(text_content(text))),
    }

    GenerationRequest { parts }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::Language;

    #[test]
    fn text_request_has_instruction_then_delimited_text() {
        let req = AnalysisRequest::text("Mitosis is cell division...", Language::English).unwrap();
        let gen = assemble(&req);
        assert_eq!(gen.parts.len(), 2);
        match (&gen.parts[0], &gen.parts[1]) {
            (ContentPart::Text(instr), ContentPart::Text(body)) => {
                assert!(instr.contains("LANGUAGE: English."));
                assert!(body.contains("[CONTENT TO ANALYZE]:\nMitosis is cell division..."));
            }
            other => panic!("unexpected parts {other:?}"),
        }
    }

    #[test]
    fn document_request_has_inline_part() {
        let req = AnalysisRequest::document(
            vec![0xFF, 0xD8, 0xFF],
            "image/jpeg",
            None,
            Language::Arabic,
            1024,
        )
        .unwrap();
        let gen = assemble(&req);
        assert_eq!(gen.parts.len(), 2);
        assert!(matches!(&gen.parts[0], ContentPart::Text(t) if t.contains("Arabic")));
        assert_eq!(
            gen.parts[1],
            ContentPart::InlineData {
                mime_type: "image/jpeg".into(),
                data: "/9j/".into(),
            }
        );
        assert!(gen.payload_len() > 4);
    }
}
