use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the extraction pipeline.
///
/// Only stage failures end up here. A field that cannot be recovered is
/// simply left unset on the record.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Recognition timed out after {0:?}")]
    RecognitionTimeout(Duration),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
