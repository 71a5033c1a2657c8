//! Error types for the rcpt-core library.
//!
//! Finding nothing is not an error: an empty description falls back to
//! [`crate::receipt::rules::FALLBACK_DESCRIPTION`] and an empty amount is an
//! empty string.

use thiserror::Error;

/// Main error type for the rcpt library.
#[derive(Error, Debug)]
pub enum ReceiptError {
    /// The scoring model is missing or malformed. Fatal for the pipeline.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Scoring failed for one receipt (backend failure or shape mismatch).
    #[error("inference error: {0}")]
    Inference(#[from] rcpt_inference::InferenceError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// The row sink rejected a record.
    #[error("sink error: {0}")]
    Sink(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised by the OCR collaborator.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the rcpt library.
pub type Result<T> = std::result::Result<T, ReceiptError>;
