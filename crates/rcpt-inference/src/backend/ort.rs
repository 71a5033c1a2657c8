//! ONNX Runtime (ort) backend for native platforms with XNNPACK.

use std::path::Path;
use std::sync::Mutex;

use ndarray::{ArrayD, IxDyn};
use ort::ep::XNNPACK;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::tensor::TensorElementType;
use ort::value::{DynValue, Tensor, ValueType};
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor, TensorInfo, TensorType};
use crate::{InferenceBackend, Result};

/// Backend using ONNX Runtime for native inference.
pub struct OrtBackend {
    session: Mutex<Session>,
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
}

impl OrtBackend {
    /// Load a model from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P, intra_threads: usize) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model from: {}", path.display());

        if !path.exists() {
            return Err(InferenceError::ModelLoad(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, intra_threads)
    }

    /// Load a model from bytes.
    pub fn from_bytes(bytes: &[u8], intra_threads: usize) -> Result<Self> {
        debug!("Loading ONNX model from {} bytes", bytes.len());

        let session = Session::builder()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_execution_providers([XNNPACK::default().build()])
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .with_intra_threads(intra_threads.max(1))
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
            .commit_from_memory(bytes)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;

        let inputs: Vec<TensorInfo> = session
            .inputs()
            .iter()
            .map(|i| describe(i.name(), i.dtype()))
            .collect();

        let outputs: Vec<TensorInfo> = session
            .outputs()
            .iter()
            .map(|o| describe(o.name(), o.dtype()))
            .collect();

        debug!("Model inputs: {:?}", inputs);
        debug!("Model outputs: {:?}", outputs);

        Ok(Self {
            session: Mutex::new(session),
            inputs,
            outputs,
        })
    }

    fn convert_input(tensor: &InputTensor) -> Result<SessionInputValue<'static>> {
        let shape: Vec<i64> = tensor.shape().iter().map(|&s| s as i64).collect();
        let value = match tensor {
            InputTensor::Float32(arr) => {
                Tensor::from_array((shape, arr.iter().copied().collect::<Vec<f32>>())).map(Into::into)
            }
            InputTensor::Int32(arr) => {
                Tensor::from_array((shape, arr.iter().copied().collect::<Vec<i32>>())).map(Into::into)
            }
            InputTensor::Int64(arr) => {
                Tensor::from_array((shape, arr.iter().copied().collect::<Vec<i64>>())).map(Into::into)
            }
        };
        value.map_err(|e| InferenceError::InvalidInput(e.to_string()))
    }
}

/// Translate an ort value type into our signature description.
fn describe(name: &str, value_type: &ValueType) -> TensorInfo {
    match value_type {
        ValueType::Tensor { ty, shape, .. } => {
            let dtype = match ty {
                TensorElementType::Float32 => Some(TensorType::Float32),
                TensorElementType::Float64 => Some(TensorType::Float64),
                TensorElementType::Int32 => Some(TensorType::Int32),
                TensorElementType::Int64 => Some(TensorType::Int64),
                _ => None,
            };
            TensorInfo::new(name, dtype, shape.iter().copied().collect())
        }
        _ => TensorInfo::new(name, None, Vec::new()),
    }
}

fn extract_output(name: &str, value: &DynValue) -> Result<OutputTensor> {
    fn to_array<T: Clone>(shape: &[i64], data: &[T]) -> Result<ArrayD<T>> {
        let shape: Vec<usize> = shape.iter().map(|&s| s as usize).collect();
        ArrayD::from_shape_vec(IxDyn(&shape), data.to_vec())
            .map_err(|e| InferenceError::OutputExtraction(e.to_string()))
    }

    if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
        Ok(OutputTensor::Float32(to_array(shape, data)?))
    } else if let Ok((shape, data)) = value.try_extract_tensor::<f64>() {
        Ok(OutputTensor::Float64(to_array(shape, data)?))
    } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
        Ok(OutputTensor::Int64(to_array(shape, data)?))
    } else if let Ok((shape, data)) = value.try_extract_tensor::<i32>() {
        Ok(OutputTensor::Int32(to_array(shape, data)?))
    } else {
        Err(InferenceError::OutputExtraction(format!(
            "unsupported output type for '{}'",
            name
        )))
    }
}

impl InferenceBackend for OrtBackend {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        let ort_inputs: Vec<(&str, SessionInputValue<'static>)> = inputs
            .iter()
            .map(|(name, tensor)| Ok((*name, Self::convert_input(tensor)?)))
            .collect::<Result<Vec<_>>>()?;

        let mut session = self.session.lock().map_err(|e| {
            InferenceError::InferenceFailed(format!("Failed to lock session: {}", e))
        })?;

        let outputs = session
            .run(ort_inputs)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        outputs
            .iter()
            .map(|(name, value)| Ok((name.to_string(), extract_output(name, &value)?)))
            .collect()
    }

    fn inputs(&self) -> &[TensorInfo] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorInfo] {
        &self.outputs
    }
}
