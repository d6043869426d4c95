//! Text sources: anything that can hand the ranker one string of document
//! text. Ranking never starts when extraction fails.

use crate::error::ExtractionError;
use std::panic;
use std::path::{Path, PathBuf};

pub trait TextSource {
    fn extract_text(&self) -> Result<String, ExtractionError>;
}

/// Text already in memory.
pub struct PlainText(pub String);

impl TextSource for PlainText {
    fn extract_text(&self) -> Result<String, ExtractionError> {
        Ok(self.0.clone())
    }
}

/// A UTF-8 text file.
pub struct TextFile(pub PathBuf);

impl TextSource for TextFile {
    fn extract_text(&self) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(&self.0).map_err(|source| ExtractionError::Io { path: self.0.clone(), source })?;
        String::from_utf8(bytes).map_err(|source| ExtractionError::NotUtf8 { path: self.0.clone(), source })
    }
}

/// An in-memory PDF, e.g. an upload.
pub struct PdfBytes(pub Vec<u8>);

impl TextSource for PdfBytes {
    fn extract_text(&self) -> Result<String, ExtractionError> {
        extract_pdf(&self.0)
    }
}

/// A PDF on disk.
pub struct PdfFile(pub PathBuf);

impl TextSource for PdfFile {
    fn extract_text(&self) -> Result<String, ExtractionError> {
        let bytes = std::fs::read(&self.0).map_err(|source| ExtractionError::Io { path: self.0.clone(), source })?;
        extract_pdf(&bytes)
    }
}

/// Pages are concatenated in document order.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    // pdf-extract can panic on malformed documents
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => {
            tracing::debug!(chars = text.len(), "extracted text from PDF");
            Ok(text)
        }
        Ok(Err(e)) => Err(ExtractionError::Pdf(e)),
        Err(_) => Err(ExtractionError::Panicked),
    }
}

/// Pick a source by file extension: `.pdf` is read as PDF, anything else as text.
pub fn source_for_path(path: &Path) -> Box<dyn TextSource> {
    let is_pdf = path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        Box::new(PdfFile(path.to_path_buf()))
    } else {
        Box::new(TextFile(path.to_path_buf()))
    }
}
