//! Pipeline stages for study-guide analysis.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! the others and without a network.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ assemble ──▶ invoke ──▶ validate
//! (form)    (base64)   (parts)      (Gemini)   (JSON → AnalysisResult)
//! ```
//!
//! 1. [`input`]: turn form fields into an [`input::AnalysisRequest`],
//!    rejecting missing or unsupported input before anything else runs
//! 2. [`encode`]: base64-wrap a document as an inline content part
//! 3. [`assemble`]: prepend the instruction block; pure, no I/O
//! 4. [`invoke`]: try candidate models in order; the only stage with
//!    network I/O
//! 5. [`validate`]: parse the model text and normalise it at the boundary

pub mod assemble;
pub mod encode;
pub mod input;
pub mod invoke;
pub mod validate;
