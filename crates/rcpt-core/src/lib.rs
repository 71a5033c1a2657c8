//! Core library for receipt OCR processing.
//!
//! This crate provides:
//! - Character-level tokenization of OCR transcripts
//! - A lazily loaded scoring model with discovered tensor shapes
//! - Description/amount extraction from per-position scores
//! - Keyword and regex heuristics that work without the model
//! - Sequential batch processing over an OCR collaborator

pub mod error;
pub mod models;
pub mod ocr;
pub mod receipt;
pub mod scoring;
pub mod sink;
pub mod tokenizer;

pub use error::{ReceiptError, Result};
pub use models::config::RcptConfig;
pub use models::receipt::{DebugInfo, Expense, ReceiptFields, ScorePair};
pub use ocr::OcrProvider;
pub use receipt::{
    BatchItem, CombinedExtractor, HeuristicExtractor, ModelExtractor, ReceiptExtractor,
    ReceiptPipeline,
};
pub use scoring::{ModelHandle, ModelLoader, ModelSignature, ReceiptModel};
pub use sink::RowSink;
pub use tokenizer::TokenizedText;

#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
#[cfg(feature = "native")]
pub use scoring::OrtModelLoader;
#[cfg(feature = "tract")]
pub use scoring::TractModelLoader;

/// Re-export inference types.
pub use rcpt_inference::{InferenceBackend, InferenceError, InputTensor, OutputTensor, TensorInfo};
