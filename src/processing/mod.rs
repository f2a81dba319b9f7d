pub mod date_parser;
pub mod field_extractor;
pub mod image_processor;
pub mod mrz;
pub mod ocr;
pub mod pdf;

pub use date_parser::DateParser;
pub use field_extractor::FieldExtractor;
pub use image_processor::ImageProcessor;
pub use mrz::MrzExtractor;
pub use ocr::{ImageRecognizer, Recognition, RecognitionProgress, TesseractRecognizer};
pub use pdf::{DocumentText, DocumentTextExtractor, PdfTextExtractor};
