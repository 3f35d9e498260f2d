use async_trait::async_trait;
use tracing::{debug, info};

use crate::errors::ExtractionError;

pub const PDF_MIME_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF-";
/// Readers accept junk before the header as long as it appears early
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Turns raw document bytes into plain text
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ExtractionError>;
}

/// Extracts the text of every page of a PDF, in page order
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[async_trait]
impl DocumentExtractor for PdfTextExtractor {
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ExtractionError> {
        if !has_pdf_header(&bytes) {
            return Err(ExtractionError::NotPdf);
        }

        let byte_count = bytes.len();
        debug!(bytes = byte_count, "Starting PDF text extraction");

        // The parser is CPU bound and may panic on hostile input
        let text = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| ExtractionError::Worker(e.to_string()))?
        .map_err(ExtractionError::InvalidPdf)?;

        info!(
            bytes = byte_count,
            chars_extracted = text.chars().count(),
            "PDF text extraction completed"
        );

        Ok(text)
    }
}

/// Check for the `%PDF-` marker near the start of the file
pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Whether a declared MIME type routes the document to the upload handler
pub fn is_pdf_mime(mime_type: Option<&str>) -> bool {
    mime_type
        .and_then(|m| m.split(';').next())
        .map(|essence| essence.trim().eq_ignore_ascii_case(PDF_MIME_TYPE))
        .unwrap_or(false)
}
