//! Markdown rendering and export of a study guide.

use crate::error::StudyGuardianError;
use crate::output::AnalysisResult;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

/// Render the four sections and a model footer.
///
/// Sections the model left empty get an italic placeholder so the document
/// always has the same outline.
pub fn render_markdown(result: &AnalysisResult) -> String {
    let mut out = String::from("# Study Guide\n\n");

    section(&mut out, "Summary", &result.summary, "_No summary was generated._");

    out.push_str("## Exam Questions\n\n");
    if result.exam_questions.is_empty() {
        out.push_str("_No exam questions were generated._\n\n");
    } else {
        for (i, question) in result.exam_questions.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, question.trim());
        }
        out.push('\n');
    }

    section(
        &mut out,
        "Explanation",
        &result.explanation,
        "_No explanation was generated._",
    );
    section(
        &mut out,
        "Study Plan",
        &result.study_plan,
        "_No study plan was generated._",
    );

    if !result.used_model.is_empty() {
        let _ = writeln!(out, "---\n\n_Generated by {}_", result.used_model);
    }
    out
}

fn section(out: &mut String, title: &str, body: &str, placeholder: &str) {
    let _ = writeln!(out, "## {title}\n");
    let body = body.trim();
    out.push_str(if body.is_empty() { placeholder } else { body });
    out.push_str("\n\n");
}

/// Write the rendered guide to `path`.
///
/// Parent directories are created; the file is written next to its final
/// name and renamed into place.
pub async fn export_markdown(
    result: &AnalysisResult,
    path: impl AsRef<Path>,
) -> Result<(), StudyGuardianError> {
    let path = path.as_ref();
    let markdown = render_markdown(result);
    let export_err = |source| StudyGuardianError::ExportFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(export_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, &markdown)
        .await
        .map_err(export_err)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(export_err)?;

    info!("Wrote study guide to {}", path.display());
    Ok(())
}
