//! Inference errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    /// Model file missing or not a valid ONNX graph.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// The runtime rejected the session configuration.
    #[error("failed to create session: {0}")]
    SessionCreate(String),

    /// Input values that cannot be represented in the requested tensor.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// An output could not be read back as a known element type.
    #[error("failed to extract output: {0}")]
    OutputExtraction(String),

    /// A tensor's length disagrees with the shape the model declares.
    #[error("shape mismatch for '{tensor}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<i64>,
        actual: Vec<usize>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
