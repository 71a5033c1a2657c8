//! ONNX inference layer for rcpt.
//!
//! Receipt scoring models take two integer tensors (token ids and attention
//! mask) and return per-position scores. This crate hides the runtime behind
//! [`InferenceBackend`] and reports the tensor signature each model declares:
//! - `ort` with the XNNPACK execution provider for native platforms
//! - `tract` as a pure-Rust alternative (feature `tract`)

mod backend;
mod error;
mod tensor;

pub use backend::InferenceBackend;
pub use error::InferenceError;
pub use tensor::{InputTensor, OutputTensor, TensorInfo, TensorType};

#[cfg(feature = "native")]
pub use backend::ort::OrtBackend;

#[cfg(feature = "tract")]
pub use backend::tract::TractBackend;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
