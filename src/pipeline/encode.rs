//! Document encoding: raw bytes → base64 inline content part.
//!
//! The generative-content API accepts PDFs and images directly as base64
//! strings embedded in the JSON request body, so no local rendering or text
//! extraction is needed. The model reads the document itself.

use crate::pipeline::assemble::ContentPart;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

/// Wrap a document as an inline content part.
pub fn inline_part(data: &[u8], mime_type: &str) -> ContentPart {
    let b64 = STANDARD.encode(data);
    debug!("Encoded {} → {} bytes base64", mime_type, b64.len());

    ContentPart::InlineData {
        mime_type: mime_type.to_string(),
        data: b64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_small_pdf() {
        let part = inline_part(b"%PDF-1.4 hello", "application/pdf");
        match part {
            ContentPart::InlineData { mime_type, data } => {
                assert_eq!(mime_type, "application/pdf");
                let decoded = STANDARD.decode(&data).expect("valid base64");
                assert_eq!(decoded, b"%PDF-1.4 hello");
            }
            other => panic!("expected inline data, got {other:?}"),
        }
    }
}
