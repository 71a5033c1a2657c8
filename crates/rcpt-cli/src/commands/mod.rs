//! Subcommands and the helpers they share.

pub mod batch;
pub mod check;
pub mod config;
pub mod model;
pub mod process;

use std::fs;
use std::path::{Path, PathBuf};

use rcpt_core::error::OcrError;
use rcpt_core::models::config::{ExtractionStrategy, OcrConfig};
use rcpt_core::{OcrProvider, OrtModelLoader, PureOcrEngine, RcptConfig, ReceiptPipeline};
use tracing::debug;

/// Image formats handed to the OCR engine.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rcpt")
        .join("config.json")
}

/// Explicit config file, else the default file if present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    let config = if let Some(path) = config_path {
        RcptConfig::from_file(Path::new(path))?
    } else {
        let default_path = default_config_path();
        if default_path.exists() {
            debug!("Using config from {}", default_path.display());
            RcptConfig::from_file(&default_path)?
        } else {
            RcptConfig::default()
        }
    };
    config.validate()?;
    Ok(config)
}

/// Extraction strategy as a CLI flag.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum StrategyArg {
    /// Model scores only
    Model,
    /// Keyword heuristics only, no model
    Heuristic,
    /// Model scores cross-checked with heuristics
    Combined,
}

impl From<StrategyArg> for ExtractionStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Model => ExtractionStrategy::Model,
            StrategyArg::Heuristic => ExtractionStrategy::Heuristic,
            StrategyArg::Combined => ExtractionStrategy::Combined,
        }
    }
}

/// Output format for receipt results.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Plain text summary
    Text,
}

/// Apply command-line overrides to the loaded configuration.
pub fn apply_overrides(
    config: &mut RcptConfig,
    model: Option<&PathBuf>,
    ocr_dir: Option<&PathBuf>,
    strategy: Option<StrategyArg>,
) {
    if let Some(path) = model {
        config.model.path = path.clone();
    }
    if let Some(dir) = ocr_dir {
        config.ocr.model_dir = dir.clone();
    }
    if let Some(strategy) = strategy {
        config.extraction.strategy = strategy.into();
    }
}

/// Pipeline over the configured ONNX model. Nothing is loaded yet.
pub fn build_pipeline(config: &RcptConfig) -> ReceiptPipeline<OrtModelLoader> {
    ReceiptPipeline::new(
        OrtModelLoader::from_config(&config.model),
        config.extraction.clone(),
    )
}

/// `.txt` files are already transcripts.
pub fn is_transcript(path: &Path) -> bool {
    extension(path) == "txt"
}

pub fn is_supported(path: &Path) -> bool {
    is_transcript(path) || IMAGE_EXTENSIONS.contains(&extension(path).as_str())
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Reads transcripts from `.txt` files and runs OCR on images.
///
/// The OCR engine is only loaded when at least one input is an image.
pub struct FileOcr {
    engine: Option<PureOcrEngine>,
}

impl FileOcr {
    pub fn for_files(files: &[PathBuf], config: &OcrConfig) -> anyhow::Result<Self> {
        let engine = if files.iter().any(|f| !is_transcript(f)) {
            let engine = PureOcrEngine::from_config(config).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to load OCR models from {}: {}",
                    config.model_dir.display(),
                    e
                )
            })?;
            Some(engine)
        } else {
            None
        };

        Ok(Self { engine })
    }
}

impl OcrProvider for FileOcr {
    type Image = PathBuf;

    fn recognize(&self, path: &PathBuf) -> Result<String, OcrError> {
        if is_transcript(path) {
            return fs::read_to_string(path)
                .map_err(|e| OcrError::InvalidImage(format!("{}: {}", path.display(), e)));
        }

        match &self.engine {
            Some(engine) => engine.recognize(path),
            None => Err(OcrError::ModelLoad("OCR engine not loaded".to_string())),
        }
    }
}
