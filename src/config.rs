use crate::processing::image_processor::DEFAULT_MAX_WIDTH;
use crate::utils::ExtractionError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tesseract language model used when none is configured.
pub const DEFAULT_LANGUAGE: &str = "eng";

/// Confidence assigned to PDF text, which has no recognition score of its own.
pub const DEFAULT_PDF_CONFIDENCE: f32 = 85.0;

/// Settings for [`crate::ExtractionPipeline`]. Every key is optional in the JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub language: String,
    pub max_width: u32,
    pub pdf_confidence: f32,
    pub tessdata_dir: Option<PathBuf>,
    /// No timeout when absent: recognition may block indefinitely.
    pub recognition_timeout_secs: Option<u64>,
    /// Where intermediate images go. Defaults to the input file's directory.
    pub work_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            language: DEFAULT_LANGUAGE.to_string(),
            max_width: DEFAULT_MAX_WIDTH,
            pdf_confidence: DEFAULT_PDF_CONFIDENCE,
            tessdata_dir: None,
            recognition_timeout_secs: None,
            work_dir: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ExtractionError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            ExtractionError::Config(format!("Failed to read config {:?}: {}", path, e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ExtractionError> {
        let config: PipelineConfig = serde_json::from_str(raw)
            .map_err(|e| ExtractionError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExtractionError> {
        if self.language.trim().is_empty() {
            return Err(ExtractionError::Config("language must not be empty".to_string()));
        }
        if self.max_width == 0 {
            return Err(ExtractionError::Config("max_width must be positive".to_string()));
        }
        if !(0.0..=100.0).contains(&self.pdf_confidence) {
            return Err(ExtractionError::Config(format!(
                "pdf_confidence must be within 0-100, got {}",
                self.pdf_confidence
            )));
        }
        if self.recognition_timeout_secs == Some(0) {
            return Err(ExtractionError::Config(
                "recognition_timeout_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn recognition_timeout(&self) -> Option<Duration> {
        self.recognition_timeout_secs.map(Duration::from_secs)
    }
}
