//! Plain-text extraction from documents on disk.
//!
//! PDF files are decoded with `pdf-extract`; page text is concatenated in
//! page order. Anything else must be UTF-8 text.

use std::fs;
use std::path::Path;

use super::error::PipelineError;

const PDF_MAGIC: &[u8] = b"%PDF-";
const TEXT_EXTENSIONS: [&str; 6] = ["txt", "text", "md", "markdown", "csv", "log"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Pdf,
    Text,
}

/// Read `path` and return its text. Runs the decoding on the blocking pool.
pub async fn extract_text(path: &Path) -> Result<String, PipelineError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || extract_text_blocking(&owned))
        .await
        .map_err(|err| PipelineError::extraction(path, format!("extraction task failed: {err}")))?
}

pub fn extract_text_blocking(path: &Path) -> Result<String, PipelineError> {
    let bytes = fs::read(path).map_err(|err| PipelineError::extraction(path, err))?;

    match detect_format(path, &bytes) {
        DocumentFormat::Pdf => {
            // pdf-extract panics on some malformed inputs instead of erroring.
            let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
                .map_err(|_| PipelineError::extraction(path, "PDF parser aborted"))?
                .map_err(|err| PipelineError::extraction(path, err))?;
            tracing::debug!(
                "Extracted {} characters from PDF {}",
                text.chars().count(),
                path.display()
            );
            Ok(text)
        }
        DocumentFormat::Text => String::from_utf8(bytes)
            .map_err(|_| PipelineError::extraction(path, "file is neither a PDF nor UTF-8 text")),
    }
}

fn detect_format(path: &Path, bytes: &[u8]) -> DocumentFormat {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("pdf") => DocumentFormat::Pdf,
        Some(ext) if TEXT_EXTENSIONS.contains(&ext) => DocumentFormat::Text,
        _ if bytes.starts_with(PDF_MAGIC) => DocumentFormat::Pdf,
        _ => DocumentFormat::Text,
    }
}
