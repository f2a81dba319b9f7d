// Passport data extraction from the command line

use clap::Parser;
use log::{debug, error};
use passport_extract::{
    models::MediaType, ExtractedRecord, ExtractionError, ExtractionPipeline, PipelineConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "passport-extract", version, about = "Extract passport fields from an image or PDF")]
struct Args {
    /// Passport scan (image) or PDF
    file: PathBuf,

    /// Declared media type, e.g. image/jpeg or application/pdf. Guessed from the extension if absent
    #[arg(long)]
    media_type: Option<String>,

    /// JSON file with pipeline settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Tesseract language model
    #[arg(long)]
    language: Option<String>,

    /// Give up on OCR after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
}

fn load_config(args: &Args) -> Result<PipelineConfig, ExtractionError> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(language) = &args.language {
        config.language = language.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        config.recognition_timeout_secs = Some(timeout);
    }
    config.validate()?;
    Ok(config)
}

fn render(record: &ExtractedRecord, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(record)
    } else {
        serde_json::to_string(record)
    }
}

fn run(args: &Args) -> Result<ExtractedRecord, ExtractionError> {
    let config = load_config(args)?;
    let media_type = args
        .media_type
        .clone()
        .unwrap_or_else(|| MediaType::guess_from_path(&args.file).as_mime().to_string());

    let pipeline = ExtractionPipeline::new(config)
        .with_progress(|event| debug!("OCR progress: {:?}", event));
    pipeline.extract(&args.file, &media_type)
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let record = match run(&args) {
        Ok(record) => record,
        Err(err) => {
            error!("Extraction failed for {:?}: {}", args.file, err);
            eprintln!("Error extracting passport data: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match render(&record, args.pretty) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error encoding result: {}", err);
            ExitCode::FAILURE
        }
    }
}
