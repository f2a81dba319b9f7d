use crate::utils::ExtractionError;
use log::debug;
use std::fs;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Text layer of a PDF document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentText {
    pub text: String,
    pub page_count: usize,
}

/// Pulls the embedded text out of a PDF. PDFs carry no recognition confidence.
pub trait DocumentTextExtractor {
    fn extract_text(&self, pdf_path: &Path) -> Result<DocumentText, ExtractionError>;
}

/// `pdf-extract` backed text extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        PdfTextExtractor
    }

    pub fn extract_from_bytes(&self, data: &[u8]) -> Result<DocumentText, ExtractionError> {
        // pdf-extract panics on some malformed documents instead of returning an error.
        let text = catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(data)))
            .map_err(|_| ExtractionError::PdfExtraction("PDF parser panicked".to_string()))?
            .map_err(|e| ExtractionError::PdfExtraction(format!("Failed to extract text: {}", e)))?;

        let page_count = pdf_extract::Document::load_mem(data)
            .map(|doc| doc.get_pages().len())
            .map_err(|e| ExtractionError::PdfExtraction(format!("Failed to load PDF: {}", e)))?;

        debug!("Extracted {} characters from {} PDF page(s)", text.len(), page_count);
        Ok(DocumentText { text, page_count })
    }
}

impl DocumentTextExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_path: &Path) -> Result<DocumentText, ExtractionError> {
        let data = fs::read(pdf_path)?;
        self.extract_from_bytes(&data)
    }
}
