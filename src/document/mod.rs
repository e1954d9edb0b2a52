// Document module
// Uploaded bytes plus their declared format, and plain-text extraction


use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Declared format of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
}

impl DocumentFormat {
    /// Infer the format from a file extension (`pdf` or `txt`, any case)
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        if extension.eq_ignore_ascii_case("pdf") {
            Ok(Self::Pdf)
        } else if extension.eq_ignore_ascii_case("txt") {
            Ok(Self::PlainText)
        } else {
            Err(ExtractionError::UnsupportedFormat(
                path.display().to_string(),
            ))
        }
    }
}

impl fmt::Display for DocumentFormat {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => f.write_str("pdf"),
            Self::PlainText => f.write_str("plain-text"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported document format: {0} (expected .pdf or .txt)")]
    UnsupportedFormat(String),
    #[error("Document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("Failed to read PDF: {0}")]
    Pdf(String),
    #[error("PDF is encrypted")]
    EncryptedPdf,
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
}

/// Raw uploaded content; lives only for one indexing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Name shown to the user, usually the file name
    pub name: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl Document {
    #[inline]
    pub fn new(name: impl Into<String>, format: DocumentFormat, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            format,
            bytes,
        }
    }

    #[inline]
    pub fn plain_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, DocumentFormat::PlainText, text.into().into_bytes())
    }

    /// Read a `.pdf` or `.txt` file from disk
    #[inline]
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let format = DocumentFormat::from_path(path)?;
        let bytes = fs::read(path)?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        debug!("Loaded {} ({}, {} bytes)", name, format, bytes.len());
        Ok(Self::new(name, format, bytes))
    }

    /// Extract the document's plain text according to its format
    #[inline]
    pub fn extract_text(&self) -> Result<String, ExtractionError> {
        match self.format {
            DocumentFormat::PlainText => Ok(String::from_utf8(self.bytes.clone())?),
            DocumentFormat::Pdf => extract_pdf_text(&self.bytes),
        }
    }
}

/// Concatenate per-page text in page order
fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pdf = lopdf::Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    if pdf.is_encrypted() {
        return Err(ExtractionError::EncryptedPdf);
    }

    let pages = pdf.get_pages();
    let mut text = String::new();

    // BTreeMap keys iterate in page order
    for page_number in pages.keys() {
        match pdf.extract_text(&[*page_number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => {
                return Err(ExtractionError::Pdf(format!(
                    "page {}: {}",
                    page_number, e
                )));
            }
        }
    }

    if text.trim().is_empty() && !pages.is_empty() {
        warn!("PDF with {} pages produced no text", pages.len());
    }

    debug!(
        "Extracted {} characters from {} PDF pages",
        text.chars().count(),
        pages.len()
    );
    Ok(text)
}
