//! # study-guardian
//!
//! Turn lecture notes, slides or pasted text into an exam-focused study guide
//! with Google Gemini.
//!
//! A request carries exactly one piece of content (a PDF, an image or plain
//! text) and an output language. The model is asked for a JSON object with a
//! concise summary, five exam questions, a simple explanation and a study
//! plan. Candidate models are tried in order until one answers.
//!
//! ## Pipeline Overview
//!
//! ```text
//! form fields / file
//!  │
//!  ├─ 1. Input     one content variant, supported mime type, size ceiling
//!  ├─ 2. Encode    file bytes → base64 inline data
//!  ├─ 3. Assemble  instruction block + content parts
//!  ├─ 4. Invoke    candidate models in order, one rotated API key
//!  └─ 5. Validate  JSON object → AnalysisResult (+ usedModel)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use study_guardian::{AnalysisRequest, Analyzer, AnalyzerConfig, Language};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Keys from GEMINI_API_KEY / GEMINI_API_KEY_BACKUP
//!     let analyzer = Analyzer::new(AnalyzerConfig::from_env()?)?;
//!     let request = AnalysisRequest::text("Mitosis is the process...", Language::English)?;
//!     let guide = analyzer.analyze(&request).await?;
//!     println!("{}", study_guardian::render_markdown(&guide));
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `study-guardian` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! The HTTP server ([`server`]) is part of the library so it can be embedded
//! or tested without the binary.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod keys;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::Analyzer;
pub use cache::ResultCache;
pub use client::{RemoteClient, RemoteError};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, ServerConfig};
pub use error::{AttemptError, ErrorKind, StudyGuardianError};
pub use output::{AnalysisResult, ErrorResponse};
pub use pipeline::input::{AnalysisRequest, DocumentContent, Language, UploadedFile};
pub use pipeline::invoke::{ContentGenerator, HarmBlockThreshold};
pub use render::{export_markdown, render_markdown};
