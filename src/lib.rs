pub mod config;
pub mod extraction_pipeline;
pub mod models;
pub mod processing;
pub mod utils;

pub use config::PipelineConfig;
pub use extraction_pipeline::ExtractionPipeline;
pub use models::ExtractedRecord;
pub use utils::ExtractionError;
