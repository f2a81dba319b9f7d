use crate::utils::ExtractionError;
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat};
use imageproc::contrast::stretch_contrast;
use imageproc::filter::sharpen3x3;
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Widest image handed to the recognizer. Wider inputs are scaled down, narrower
/// inputs are never enlarged.
pub const DEFAULT_MAX_WIDTH: u32 = 2000;

// Share of pixels ignored at each end of the histogram when stretching contrast.
const CONTRAST_CLIP: f64 = 0.01;

/// ImageProcessor prepares a scanned page for OCR:
/// greyscale, contrast normalization, sharpening, then a width cap.
pub struct ImageProcessor {
    max_width: u32,
}

impl Default for ImageProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WIDTH)
    }
}

impl ImageProcessor {
    pub fn new(max_width: u32) -> Self {
        ImageProcessor {
            max_width: max_width.max(1),
        }
    }

    /// Write an OCR-ready copy of `input` to `output` and return the path to recognize.
    ///
    /// Never fails: if the image cannot be processed the original `input` path is
    /// returned so recognition can still run on the raw file. `input` is left untouched.
    pub fn preprocess(&self, input: &Path, output: &Path) -> PathBuf {
        match self.try_preprocess(input, output) {
            Ok(()) => {
                debug!("Preprocessed {:?} into {:?}", input, output);
                output.to_path_buf()
            }
            Err(e) => {
                warn!("Preprocessing failed for {:?}, using original image: {}", input, e);
                input.to_path_buf()
            }
        }
    }

    pub fn try_preprocess(&self, input: &Path, output: &Path) -> Result<(), ExtractionError> {
        let image = image::open(input)
            .map_err(|e| ExtractionError::ImageProcessing(format!("Failed to load image: {}", e)))?;

        let processed = self.enhance(&image);

        DynamicImage::ImageLuma8(processed)
            .save_with_format(output, ImageFormat::Png)
            .map_err(|e| {
                ExtractionError::ImageProcessing(format!("Failed to write processed image: {}", e))
            })
    }

    /// The in-memory part of preprocessing.
    pub fn enhance(&self, image: &DynamicImage) -> GrayImage {
        let grayscale = image.to_luma8();
        let normalized = normalize_contrast(&grayscale);
        let sharpened = sharpen3x3(&normalized);
        self.limit_width(sharpened)
    }

    fn limit_width(&self, image: GrayImage) -> GrayImage {
        let (width, height) = image.dimensions();
        if width <= self.max_width {
            return image;
        }
        let scaled_height = ((height as u64 * self.max_width as u64) / width as u64).max(1) as u32;
        debug!(
            "Resizing {}x{} to {}x{}",
            width, height, self.max_width, scaled_height
        );
        image::imageops::resize(&image, self.max_width, scaled_height, FilterType::Lanczos3)
    }
}

/// Stretch the intensity range so the darkest and brightest 1% of pixels map to
/// black and white.
fn normalize_contrast(image: &GrayImage) -> GrayImage {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total = image.width() as u64 * image.height() as u64;
    if total == 0 {
        return image.clone();
    }
    let clip = (total as f64 * CONTRAST_CLIP) as u64;

    let lower = level_after(histogram.iter().enumerate(), clip);
    let upper = level_after(histogram.iter().enumerate().rev(), clip);

    match (lower, upper) {
        (Some(lower), Some(upper)) if lower < upper => stretch_contrast(image, lower, upper),
        _ => image.clone(),
    }
}

// First intensity level at which the running count exceeds `clip`.
fn level_after<'a>(levels: impl Iterator<Item = (usize, &'a u64)>, clip: u64) -> Option<u8> {
    let mut seen = 0u64;
    for (level, count) in levels {
        seen += count;
        if seen > clip {
            return Some(level as u8);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Luma, Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| Luma([(x % 256) as u8]))
    }

    #[test]
    fn test_wide_images_are_capped() {
        let processor = ImageProcessor::default();
        let output = processor.enhance(&DynamicImage::ImageLuma8(gradient(2400, 120)));
        assert_eq!(output.dimensions(), (2000, 100));
    }

    #[test]
    fn test_narrow_images_are_not_enlarged() {
        let processor = ImageProcessor::default();
        let output = processor.enhance(&DynamicImage::ImageLuma8(gradient(640, 480)));
        assert_eq!(output.dimensions(), (640, 480));

        let output = processor.enhance(&DynamicImage::ImageLuma8(gradient(2000, 10)));
        assert_eq!(output.dimensions(), (2000, 10));
    }

    #[test]
    fn test_contrast_is_stretched() {
        let faded = GrayImage::from_fn(200, 20, |x, _| Luma([100 + (x % 50) as u8]));
        let stretched = normalize_contrast(&faded);

        let min = stretched.pixels().map(|p| p.0[0]).min().unwrap();
        let max = stretched.pixels().map(|p| p.0[0]).max().unwrap();
        assert!(min < 20, "min was {}", min);
        assert!(max > 235, "max was {}", max);
    }

    #[test]
    fn test_flat_image_is_left_alone() {
        let flat = GrayImage::from_pixel(50, 50, Luma([128]));
        assert_eq!(normalize_contrast(&flat), flat);
    }

    #[test]
    fn test_preprocess_writes_greyscale_png() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("scan.png");
        let output = dir.path().join("scan_processed.png");
        RgbImage::from_fn(2200, 300, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
            .save(&input)
            .unwrap();

        let result = ImageProcessor::default().preprocess(&input, &output);
        assert_eq!(result, output);
        assert!(input.exists());

        let written = image::open(&output).unwrap();
        assert_eq!(written.dimensions().0, 2000);
        assert!(matches!(written, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_unreadable_input_falls_back_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.jpg");
        let output = dir.path().join("broken_processed.png");
        std::fs::write(&input, b"definitely not a jpeg").unwrap();

        let result = ImageProcessor::default().preprocess(&input, &output);
        assert_eq!(result, input);
        assert!(!output.exists());

        let missing = dir.path().join("missing.png");
        assert_eq!(ImageProcessor::default().preprocess(&missing, &output), missing);
    }
}
