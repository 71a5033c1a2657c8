//! Tract backend for pure-Rust ONNX inference.
//!
//! Tract needs concrete input facts before it can type and optimize a graph,
//! so the caller supplies the sequence length and token element type. Output
//! shapes are then read back from the optimized model.

use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use tract_onnx::prelude::*;
use tracing::debug;

use crate::error::InferenceError;
use crate::tensor::{InputTensor, OutputTensor, TensorInfo, TensorType};
use crate::{InferenceBackend, Result};

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Backend using Tract for cross-platform ONNX inference.
pub struct TractBackend {
    model: Plan,
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
}

impl TractBackend {
    /// Load a `[1, sequence_length]` token model from a file path.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        sequence_length: usize,
        token_type: TensorType,
    ) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model with Tract from: {}", path.display());

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to load model: {}", e)))?;

        Self::prepare(model, sequence_length, token_type)
    }

    fn prepare(
        mut model: InferenceModel,
        sequence_length: usize,
        token_type: TensorType,
    ) -> Result<Self> {
        let datum = match token_type {
            TensorType::Int32 => i32::datum_type(),
            TensorType::Int64 => i64::datum_type(),
            other => {
                return Err(InferenceError::ModelLoad(format!(
                    "unsupported token type for tract: {:?}",
                    other
                )))
            }
        };
        let input_shape = [1, sequence_length];

        // Token ids and attention mask share shape and element type
        for slot in 0..model.input_outlets().map_err(to_load_error)?.len() {
            model
                .set_input_fact(slot, InferenceFact::dt_shape(datum, &input_shape[..]))
                .map_err(|e| InferenceError::ModelLoad(format!("Failed to set input shape: {}", e)))?;
        }

        let typed = model
            .into_typed()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to type model: {}", e)))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(format!("Failed to optimize: {}", e)))?;

        let inputs: Vec<TensorInfo> = typed
            .input_outlets()
            .map_err(to_load_error)?
            .iter()
            .map(|outlet| {
                TensorInfo::new(
                    typed.node(outlet.node).name.clone(),
                    Some(token_type),
                    vec![1, sequence_length as i64],
                )
            })
            .collect();

        let outputs = (0..typed.output_outlets().map_err(to_load_error)?.len())
            .map(|slot| {
                let outlet = typed.output_outlets()?[slot];
                let fact = typed.output_fact(slot)?;
                let shape = match fact.shape.as_concrete() {
                    Some(dims) => dims.iter().map(|&d| d as i64).collect(),
                    None => vec![-1; fact.rank()],
                };
                Ok(TensorInfo::new(
                    typed.node(outlet.node).name.clone(),
                    Some(TensorType::Float32),
                    shape,
                ))
            })
            .collect::<TractResult<Vec<_>>>()
            .map_err(to_load_error)?;

        let model = typed
            .into_runnable()
            .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

        Ok(Self {
            model,
            inputs,
            outputs,
        })
    }

    fn convert_input(tensor: &InputTensor) -> Result<TValue> {
        fn to_tvalue<T: Datum + Clone>(shape: &[usize], data: Vec<T>) -> Result<TValue> {
            let arr = tract_ndarray::ArrayD::from_shape_vec(tract_ndarray::IxDyn(shape), data)
                .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
            Ok(arr.into_tvalue())
        }

        match tensor {
            InputTensor::Float32(arr) => to_tvalue(arr.shape(), arr.iter().copied().collect()),
            InputTensor::Int32(arr) => to_tvalue(arr.shape(), arr.iter().copied().collect()),
            InputTensor::Int64(arr) => to_tvalue(arr.shape(), arr.iter().copied().collect()),
        }
    }
}

fn to_load_error(e: TractError) -> InferenceError {
    InferenceError::ModelLoad(e.to_string())
}

impl InferenceBackend for TractBackend {
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>> {
        // Tract binds inputs by position, so reorder them to declaration order
        let mut ordered: TVec<TValue> = TVec::new();
        for (slot, info) in self.inputs.iter().enumerate() {
            let tensor = inputs
                .iter()
                .find(|(name, _)| *name == info.name)
                .or_else(|| inputs.get(slot))
                .map(|(_, tensor)| tensor)
                .ok_or_else(|| InferenceError::InvalidInput(format!("missing input '{}'", info.name)))?;
            ordered.push(Self::convert_input(tensor)?);
        }

        let outputs = self
            .model
            .run(ordered)
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let mut results = Vec::with_capacity(outputs.len());

        for (idx, output) in outputs.iter().enumerate() {
            let name = self
                .outputs
                .get(idx)
                .map(|info| info.name.clone())
                .unwrap_or_else(|| format!("output_{}", idx));

            let tensor = if let Ok(view) = output.to_array_view::<f32>() {
                let data: Vec<f32> = view.iter().copied().collect();
                ArrayD::from_shape_vec(IxDyn(view.shape()), data).map(OutputTensor::Float32)
            } else if let Ok(view) = output.to_array_view::<f64>() {
                let data: Vec<f64> = view.iter().copied().collect();
                ArrayD::from_shape_vec(IxDyn(view.shape()), data).map(OutputTensor::Float64)
            } else if let Ok(view) = output.to_array_view::<i64>() {
                let data: Vec<i64> = view.iter().copied().collect();
                ArrayD::from_shape_vec(IxDyn(view.shape()), data).map(OutputTensor::Int64)
            } else {
                return Err(InferenceError::OutputExtraction(format!(
                    "unsupported output type for '{}'",
                    name
                )));
            }
            .map_err(|e| InferenceError::OutputExtraction(e.to_string()))?;

            results.push((name, tensor));
        }

        Ok(results)
    }

    fn inputs(&self) -> &[TensorInfo] {
        &self.inputs
    }

    fn outputs(&self) -> &[TensorInfo] {
        &self.outputs
    }
}
