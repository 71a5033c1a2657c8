//! Configuration structures for the receipt pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ReceiptError;

/// Main configuration for the rcpt pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RcptConfig {
    /// Scoring model configuration.
    pub model: ModelConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// OCR configuration.
    pub ocr: OcrConfig,

    /// Output row configuration.
    pub sheet: SheetConfig,
}

/// Scoring model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the ONNX token-scoring model.
    pub path: PathBuf,

    /// Sequence length used only when the model declares a dynamic one.
    pub fallback_sequence_length: Option<usize>,

    /// Number of CPU threads for a single inference call.
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/receipt_scorer.onnx"),
            fallback_sequence_length: Some(256),
            intra_threads: 4,
        }
    }
}

/// Which extraction strategy the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    /// Model scores only.
    #[default]
    Model,
    /// Keyword/regex heuristics only; the model is never loaded.
    Heuristic,
    /// Model scores, with the heuristic total filling an empty amount.
    Combined,
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Width of the sliding description window, in characters.
    pub description_window: usize,

    /// Maximum length of a cleaned description, in characters.
    pub max_description_len: usize,

    /// Largest accepted amount (inclusive).
    pub max_amount: u32,

    /// Peak score both fields must exceed for an extraction to be reliable.
    pub reliability_threshold: f32,

    /// Extraction strategy.
    pub strategy: ExtractionStrategy,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            description_window: 20,
            max_description_len: 50,
            max_amount: 99_999,
            reliability_threshold: 0.3,
            strategy: ExtractionStrategy::Model,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing OCR model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` markers in recognized text instead of blanking them.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/ocr"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
        }
    }
}

/// Output row configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Currency column value.
    pub currency: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
        }
    }
}

impl RcptConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }

    /// Get full path to an OCR model file.
    pub fn ocr_model_path(&self, file_name: &str) -> PathBuf {
        self.ocr.model_dir.join(file_name)
    }

    /// Reject settings the extractors cannot work with.
    pub fn validate(&self) -> crate::error::Result<()> {
        let extraction = &self.extraction;
        if extraction.description_window == 0 {
            return Err(ReceiptError::Config("extraction.description_window must be positive".into()));
        }
        if extraction.max_description_len == 0 {
            return Err(ReceiptError::Config("extraction.max_description_len must be positive".into()));
        }
        if extraction.max_amount == 0 {
            return Err(ReceiptError::Config("extraction.max_amount must be positive".into()));
        }
        if !extraction.reliability_threshold.is_finite() {
            return Err(ReceiptError::Config("extraction.reliability_threshold must be a number".into()));
        }
        if self.model.fallback_sequence_length == Some(0) {
            return Err(ReceiptError::Config("model.fallback_sequence_length must be positive".into()));
        }
        Ok(())
    }
}
