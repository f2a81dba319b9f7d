use crate::config::PipelineConfig;
use crate::models::{ExtractedRecord, MediaType};
use crate::processing::*;
use crate::utils::ExtractionError;
use log::{info, warn};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub type ProgressCallback = Box<dyn Fn(RecognitionProgress) + Send + Sync>;

/// Turns an uploaded passport image or PDF into an [`ExtractedRecord`].
///
/// Each call is independent; the only shared resource is the directory that
/// holds intermediate images, and those files are uniquely named per call.
pub struct ExtractionPipeline {
    config: PipelineConfig,
    preprocessor: ImageProcessor,
    recognizer: Box<dyn ImageRecognizer + Send + Sync>,
    pdf_extractor: Box<dyn DocumentTextExtractor + Send + Sync>,
    progress: Option<ProgressCallback>,
}

impl ExtractionPipeline {
    /// Pipeline backed by Tesseract and pdf-extract.
    pub fn new(config: PipelineConfig) -> Self {
        let mut recognizer = TesseractRecognizer::new();
        if let Some(dir) = &config.tessdata_dir {
            recognizer = recognizer.with_datapath(dir.clone());
        }
        if let Some(timeout) = config.recognition_timeout() {
            recognizer = recognizer.with_timeout(timeout);
        }
        Self::with_engines(config, recognizer, PdfTextExtractor::new())
    }

    pub fn with_engines<R, D>(config: PipelineConfig, recognizer: R, pdf_extractor: D) -> Self
    where
        R: ImageRecognizer + Send + Sync + 'static,
        D: DocumentTextExtractor + Send + Sync + 'static,
    {
        ExtractionPipeline {
            preprocessor: ImageProcessor::new(config.max_width),
            config,
            recognizer: Box::new(recognizer),
            pdf_extractor: Box::new(pdf_extractor),
            progress: None,
        }
    }

    /// Receive recognition progress for image inputs.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(RecognitionProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Extract passport data from `path`. `media_type` picks the branch:
    /// `application/pdf` reads the text layer, anything else is OCR'd as an image.
    ///
    /// Recognition and PDF failures are returned as-is with no partial record.
    pub fn extract(&self, path: &Path, media_type: &str) -> Result<ExtractedRecord, ExtractionError> {
        match MediaType::from_mime(media_type) {
            MediaType::Pdf => self.extract_pdf(path),
            MediaType::Image => self.extract_image(path),
        }
    }

    fn extract_pdf(&self, path: &Path) -> Result<ExtractedRecord, ExtractionError> {
        let document = self.pdf_extractor.extract_text(path)?;
        info!("Read {} page(s) of PDF text from {:?}", document.page_count, path);

        let mut record = Self::structure(&document.text);
        record.set_confidence(self.config.pdf_confidence);
        Ok(record)
    }

    fn extract_image(&self, path: &Path) -> Result<ExtractedRecord, ExtractionError> {
        // Deleted when dropped, whichever way this function returns.
        let scratch = self.scratch_file(path);
        let recognition_path = match &scratch {
            Some(file) => self.preprocessor.preprocess(path, file.path()),
            None => path.to_path_buf(),
        };

        let progress = self
            .progress
            .as_deref()
            .map(|callback| callback as &dyn Fn(RecognitionProgress));
        let recognition =
            self.recognizer
                .recognize(&recognition_path, &self.config.language, progress)?;
        drop(scratch);

        let mut record = Self::structure(&recognition.text);
        record.set_confidence(recognition.confidence);
        Ok(record)
    }

    /// Build a record from recognized text. Confidence is left to the caller.
    ///
    /// Precedence, lowest first:
    /// 1. the MRZ line pair found in the text,
    /// 2. FieldExtractor output, itself an MRZ baseline with labelled fields on top.
    ///
    /// A labelled field therefore always beats the MRZ for the same field.
    /// Without the passport MRZ signature (`P<` + issuing state + names) no MRZ
    /// is decoded, so visa or ID-card zones contribute nothing.
    pub fn structure(text: &str) -> ExtractedRecord {
        let mut record = ExtractedRecord::new();
        if FieldExtractor::has_mrz_signature(text) {
            if let Some(pair) = MrzExtractor::find_line_pair(text) {
                record = MrzExtractor::decode(&pair.line1, &pair.line2);
                if let Some(report) = MrzExtractor::verify_check_digits(&pair.line2) {
                    if !report.is_valid() {
                        warn!("MRZ check digits failed: {}", report.failures().join(", "));
                    }
                }
            }
        }
        record.overlay(FieldExtractor::extract(text));

        record.extracted_text = Some(text.to_string());
        record
    }

    /// A uniquely named `<stem>_processed*.png` next to the input (or in `work_dir`).
    fn scratch_file(&self, input: &Path) -> Option<NamedTempFile> {
        let dir = match &self.config.work_dir {
            Some(dir) => dir.clone(),
            None => match input.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        };
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("upload");

        match tempfile::Builder::new()
            .prefix(&format!("{}_processed", stem))
            .suffix(".png")
            .tempfile_in(&dir)
        {
            Ok(file) => Some(file),
            Err(e) => {
                warn!("Cannot create intermediate image in {:?}, skipping preprocessing: {}", dir, e);
                None
            }
        }
    }
}
