//! Inference backend implementations.

#[cfg(feature = "native")]
pub mod ort;

#[cfg(feature = "tract")]
pub mod tract;

use crate::{InputTensor, OutputTensor, Result, TensorInfo};

/// Trait for ONNX inference backends.
///
/// This trait abstracts over different ONNX runtime implementations. Besides
/// running the graph, a backend reports the signature the loaded model
/// declares so callers can size their buffers from it instead of assuming
/// fixed lengths.
pub trait InferenceBackend: Send + Sync {
    /// Run inference with the given inputs.
    ///
    /// # Arguments
    /// * `inputs` - Named input tensors
    ///
    /// # Returns
    /// Named output tensors from the model, in declaration order
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>>;

    /// Inputs declared by the model, in declaration order.
    fn inputs(&self) -> &[TensorInfo];

    /// Outputs declared by the model, in declaration order.
    fn outputs(&self) -> &[TensorInfo];
}
