use crate::utils::ExtractionError;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tesseract::Tesseract;

/// Recognized text and the engine's 0-100 confidence in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub confidence: f32,
}

/// Progress notifications emitted while an image is being recognized.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionProgress {
    Initializing { language: String },
    Recognizing,
    Completed { confidence: f32 },
}

/// An OCR engine that turns an image file into text.
pub trait ImageRecognizer {
    /// Recognize `image_path` using the `language` model. Progress, if wanted, is
    /// reported through `progress`; the engine never prints on its own.
    fn recognize(
        &self,
        image_path: &Path,
        language: &str,
        progress: Option<&dyn Fn(RecognitionProgress)>,
    ) -> Result<Recognition, ExtractionError>;
}

/// Tesseract-backed recognizer.
#[derive(Debug, Clone, Default)]
pub struct TesseractRecognizer {
    datapath: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl TesseractRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding the `tessdata` models. Defaults to Tesseract's own lookup
    /// (including `TESSDATA_PREFIX`).
    pub fn with_datapath(mut self, datapath: impl Into<PathBuf>) -> Self {
        self.datapath = Some(datapath.into());
        self
    }

    /// Give up on a recognition call after `timeout`. The Tesseract call itself cannot be
    /// interrupted, so the worker thread is left to finish in the background.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl ImageRecognizer for TesseractRecognizer {
    fn recognize(
        &self,
        image_path: &Path,
        language: &str,
        progress: Option<&dyn Fn(RecognitionProgress)>,
    ) -> Result<Recognition, ExtractionError> {
        let notify = |event: RecognitionProgress| {
            if let Some(callback) = progress {
                callback(event);
            }
        };

        let image_path = image_path
            .to_str()
            .ok_or_else(|| {
                ExtractionError::Recognition(format!("Image path is not valid UTF-8: {:?}", image_path))
            })?
            .to_string();
        let datapath = self
            .datapath
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned());
        let language = language.to_string();

        notify(RecognitionProgress::Initializing {
            language: language.clone(),
        });
        info!("Running Tesseract ({}) on {}", language, image_path);
        notify(RecognitionProgress::Recognizing);

        let recognition = match self.timeout {
            None => run_tesseract(datapath.as_deref(), &language, &image_path)?,
            Some(limit) => {
                let (sender, receiver) = mpsc::channel();
                thread::spawn(move || {
                    let result = run_tesseract(datapath.as_deref(), &language, &image_path);
                    // The receiver is gone if the caller already timed out.
                    let _ = sender.send(result);
                });
                match receiver.recv_timeout(limit) {
                    Ok(result) => result?,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(ExtractionError::RecognitionTimeout(limit))
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(ExtractionError::Recognition(
                            "Recognition worker exited without a result".to_string(),
                        ))
                    }
                }
            }
        };

        debug!(
            "Tesseract returned {} characters at confidence {}",
            recognition.text.len(),
            recognition.confidence
        );
        notify(RecognitionProgress::Completed {
            confidence: recognition.confidence,
        });
        Ok(recognition)
    }
}

fn run_tesseract(
    datapath: Option<&str>,
    language: &str,
    image_path: &str,
) -> Result<Recognition, ExtractionError> {
    let mut tess = Tesseract::new(datapath, Some(language))
        .map_err(|e| ExtractionError::Recognition(format!("Failed to initialize Tesseract: {}", e)))?
        .set_image(image_path)
        .map_err(|e| ExtractionError::Recognition(format!("Failed to set image: {}", e)))?
        .recognize()
        .map_err(|e| ExtractionError::Recognition(format!("Recognition failed: {}", e)))?;

    let text = tess
        .get_text()
        .map_err(|e| ExtractionError::Recognition(format!("Failed to extract text: {}", e)))?;
    let confidence = tess.mean_text_conf() as f32;

    Ok(Recognition {
        text,
        confidence: confidence.clamp(0.0, 100.0),
    })
}
