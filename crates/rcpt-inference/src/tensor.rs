//! Tensor types for inference input/output.

use ndarray::{Array2, ArrayD};

use crate::{InferenceError, Result};

/// Supported tensor element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorType {
    Float32,
    Float64,
    Int32,
    Int64,
}

/// Name, element type and declared shape of one model input or output.
///
/// Dynamic dimensions are reported as `-1`, the way ONNX declares them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub dtype: Option<TensorType>,
    pub shape: Vec<i64>,
}

impl TensorInfo {
    pub fn new(name: impl Into<String>, dtype: Option<TensorType>, shape: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape,
        }
    }

    /// Size of dimension `axis`, or `None` if it is dynamic or absent.
    pub fn dim(&self, axis: usize) -> Option<usize> {
        self.shape
            .get(axis)
            .copied()
            .filter(|&d| d > 0)
            .map(|d| d as usize)
    }

    /// Size of the innermost dimension, or `None` if it is dynamic.
    pub fn last_dim(&self) -> Option<usize> {
        self.shape.len().checked_sub(1).and_then(|axis| self.dim(axis))
    }

    /// Total number of elements, or `None` if any dimension is dynamic.
    pub fn element_count(&self) -> Option<usize> {
        (0..self.shape.len()).try_fold(1usize, |acc, axis| self.dim(axis).map(|d| acc * d))
    }
}

/// Input tensor for inference.
#[derive(Debug, Clone)]
pub enum InputTensor {
    Float32(ArrayD<f32>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
}

impl InputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            InputTensor::Float32(arr) => arr.shape(),
            InputTensor::Int32(arr) => arr.shape(),
            InputTensor::Int64(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> TensorType {
        match self {
            InputTensor::Float32(_) => TensorType::Float32,
            InputTensor::Int32(_) => TensorType::Int32,
            InputTensor::Int64(_) => TensorType::Int64,
        }
    }

    /// Build a `[1, len]` batch row with the element type the model expects.
    pub fn row(values: &[i64], dtype: TensorType) -> Result<Self> {
        let len = values.len();
        let invalid = |e: ndarray::ShapeError| InferenceError::InvalidInput(e.to_string());

        let tensor = match dtype {
            TensorType::Int64 => InputTensor::Int64(
                Array2::from_shape_vec((1, len), values.to_vec())
                    .map_err(invalid)?
                    .into_dyn(),
            ),
            TensorType::Int32 => {
                let data = values
                    .iter()
                    .map(|&v| {
                        i32::try_from(v).map_err(|_| {
                            InferenceError::InvalidInput(format!("value {} overflows int32", v))
                        })
                    })
                    .collect::<Result<Vec<i32>>>()?;
                InputTensor::Int32(Array2::from_shape_vec((1, len), data).map_err(invalid)?.into_dyn())
            }
            TensorType::Float32 | TensorType::Float64 => {
                let data: Vec<f32> = values.iter().map(|&v| v as f32).collect();
                InputTensor::Float32(Array2::from_shape_vec((1, len), data).map_err(invalid)?.into_dyn())
            }
        };

        Ok(tensor)
    }
}

/// Output tensor from inference.
#[derive(Debug, Clone)]
pub enum OutputTensor {
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
}

impl OutputTensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            OutputTensor::Float32(arr) => arr.shape(),
            OutputTensor::Float64(arr) => arr.shape(),
            OutputTensor::Int32(arr) => arr.shape(),
            OutputTensor::Int64(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> TensorType {
        match self {
            OutputTensor::Float32(_) => TensorType::Float32,
            OutputTensor::Float64(_) => TensorType::Float64,
            OutputTensor::Int32(_) => TensorType::Int32,
            OutputTensor::Int64(_) => TensorType::Int64,
        }
    }

    /// Flatten the tensor into `f32` scores in logical (row-major) order.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match self {
            OutputTensor::Float32(arr) => arr.iter().copied().collect(),
            OutputTensor::Float64(arr) => arr.iter().map(|&v| v as f32).collect(),
            OutputTensor::Int32(arr) => arr.iter().map(|&v| v as f32).collect(),
            OutputTensor::Int64(arr) => arr.iter().map(|&v| v as f32).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_row_matches_requested_dtype() {
        let ids = [12, 1, 36, 0];

        let row = InputTensor::row(&ids, TensorType::Int32).unwrap();
        assert_eq!(row.dtype(), TensorType::Int32);
        assert_eq!(row.shape(), &[1, 4]);

        let row = InputTensor::row(&ids, TensorType::Int64).unwrap();
        assert_eq!(row.dtype(), TensorType::Int64);
        assert_eq!(row.shape(), &[1, 4]);
    }

    #[test]
    fn test_row_rejects_int32_overflow() {
        let result = InputTensor::row(&[i64::MAX], TensorType::Int32);
        assert!(matches!(result, Err(InferenceError::InvalidInput(_))));
    }

    #[test]
    fn test_tensor_info_dims() {
        let info = TensorInfo::new("input_ids", Some(TensorType::Int32), vec![1, 384]);
        assert_eq!(info.dim(1), Some(384));
        assert_eq!(info.last_dim(), Some(384));

        let dynamic = TensorInfo::new("logits", None, vec![-1, -1]);
        assert_eq!(dynamic.dim(0), None);
        assert_eq!(dynamic.last_dim(), None);

        let scalar = TensorInfo::new("x", None, vec![]);
        assert_eq!(scalar.last_dim(), None);

        assert_eq!(info.element_count(), Some(384));
        assert_eq!(dynamic.element_count(), None);
        let column = TensorInfo::new("scores", None, vec![1, 64, 1]);
        assert_eq!(column.element_count(), Some(64));
    }

    #[test]
    fn test_output_flattening() {
        let arr = ndarray::Array2::from_shape_vec((1, 3), vec![0.5f64, 1.0, -2.0])
            .unwrap()
            .into_dyn();
        let output = OutputTensor::Float64(arr);
        assert_eq!(output.shape(), &[1, 3]);
        assert_eq!(output.to_f32_vec(), vec![0.5, 1.0, -2.0]);
    }
}
