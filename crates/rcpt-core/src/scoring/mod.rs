//! Inference adapter: the scoring model and its lifecycle.

mod handle;
mod model;

pub use handle::{ModelHandle, ModelLoader};
pub use model::{ModelSignature, OutputSlot, ReceiptModel};

#[cfg(any(feature = "native", feature = "tract"))]
use std::path::PathBuf;

#[cfg(feature = "native")]
use crate::models::config::ModelConfig;

/// Loads the scoring model with ONNX Runtime.
#[cfg(feature = "native")]
#[derive(Debug, Clone)]
pub struct OrtModelLoader {
    path: PathBuf,
    intra_threads: usize,
    fallback_sequence_length: Option<usize>,
}

#[cfg(feature = "native")]
impl OrtModelLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            intra_threads: 4,
            fallback_sequence_length: None,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            path: config.path.clone(),
            intra_threads: config.intra_threads,
            fallback_sequence_length: config.fallback_sequence_length,
        }
    }
}

#[cfg(feature = "native")]
impl ModelLoader for OrtModelLoader {
    type Backend = rcpt_inference::OrtBackend;

    fn load(&self) -> rcpt_inference::Result<Self::Backend> {
        rcpt_inference::OrtBackend::from_file(&self.path, self.intra_threads)
    }

    fn fallback_sequence_length(&self) -> Option<usize> {
        self.fallback_sequence_length
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Loads the scoring model with tract at a fixed sequence length.
#[cfg(feature = "tract")]
#[derive(Debug, Clone)]
pub struct TractModelLoader {
    path: PathBuf,
    sequence_length: usize,
    token_type: rcpt_inference::TensorType,
}

#[cfg(feature = "tract")]
impl TractModelLoader {
    pub fn new(path: impl Into<PathBuf>, sequence_length: usize) -> Self {
        Self {
            path: path.into(),
            sequence_length,
            token_type: rcpt_inference::TensorType::Int32,
        }
    }

    pub fn with_token_type(mut self, token_type: rcpt_inference::TensorType) -> Self {
        self.token_type = token_type;
        self
    }
}

#[cfg(feature = "tract")]
impl ModelLoader for TractModelLoader {
    type Backend = rcpt_inference::TractBackend;

    fn load(&self) -> rcpt_inference::Result<Self::Backend> {
        rcpt_inference::TractBackend::from_file(&self.path, self.sequence_length, self.token_type)
    }

    fn fallback_sequence_length(&self) -> Option<usize> {
        Some(self.sequence_length)
    }

    fn describe(&self) -> String {
        format!("{} (tract)", self.path.display())
    }
}

/// In-memory backend and loader for tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use ndarray::Array2;
    use rcpt_inference::{
        InferenceBackend, InferenceError, InputTensor, OutputTensor, TensorInfo, TensorType,
    };

    use super::ModelLoader;

    /// Returns fixed score vectors and records what it was fed.
    pub(crate) struct FakeBackend {
        inputs: Vec<TensorInfo>,
        outputs: Vec<TensorInfo>,
        description: Vec<f32>,
        amount: Vec<f32>,
        seen: Mutex<Vec<(String, Vec<i64>)>>,
        runs: Arc<AtomicUsize>,
    }

    impl FakeBackend {
        pub(crate) fn new(sequence_length: usize, description: Vec<f32>, amount: Vec<f32>) -> Self {
            let len = sequence_length as i64;
            Self {
                inputs: vec![
                    TensorInfo::new("input_ids", Some(TensorType::Int32), vec![1, len]),
                    TensorInfo::new("attention_mask", Some(TensorType::Int32), vec![1, len]),
                ],
                outputs: vec![
                    TensorInfo::new("description", Some(TensorType::Float32), vec![1, description.len() as i64]),
                    TensorInfo::new("amount", Some(TensorType::Float32), vec![1, amount.len() as i64]),
                ],
                description,
                amount,
                seen: Mutex::new(Vec::new()),
                runs: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Override the declared output lengths.
        pub(crate) fn with_declared_outputs(mut self, description: i64, amount: i64) -> Self {
            self.outputs[0].shape = vec![1, description];
            self.outputs[1].shape = vec![1, amount];
            self
        }

        pub(crate) fn last_inputs(&self) -> Vec<(String, Vec<i64>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    fn row(values: &[f32]) -> OutputTensor {
        OutputTensor::Float32(
            Array2::from_shape_vec((1, values.len()), values.to_vec())
                .unwrap()
                .into_dyn(),
        )
    }

    impl InferenceBackend for FakeBackend {
        fn run(
            &self,
            inputs: &[(&str, InputTensor)],
        ) -> rcpt_inference::Result<Vec<(String, OutputTensor)>> {
            let mut seen = Vec::new();
            for (name, tensor) in inputs {
                let values: Vec<i64> = match tensor {
                    InputTensor::Int32(arr) => arr.iter().map(|&v| v as i64).collect(),
                    InputTensor::Int64(arr) => arr.iter().copied().collect(),
                    InputTensor::Float32(_) => {
                        return Err(InferenceError::InvalidInput("float tokens".into()))
                    }
                };
                seen.push((name.to_string(), values));
            }
            *self.seen.lock().unwrap() = seen;
            self.runs.fetch_add(1, Ordering::SeqCst);

            Ok(vec![
                ("description".to_string(), row(&self.description)),
                ("amount".to_string(), row(&self.amount)),
            ])
        }

        fn inputs(&self) -> &[TensorInfo] {
            &self.inputs
        }

        fn outputs(&self) -> &[TensorInfo] {
            &self.outputs
        }
    }

    /// Builds [`FakeBackend`]s and counts how often it was asked to.
    pub(crate) struct FakeLoader {
        sequence_length: usize,
        description: Vec<f32>,
        amount: Vec<f32>,
        delay: Duration,
        fail: bool,
        loads: Arc<AtomicUsize>,
        runs: Arc<AtomicUsize>,
    }

    impl FakeLoader {
        pub(crate) fn new(sequence_length: usize) -> Self {
            Self {
                sequence_length,
                description: vec![0.0; sequence_length],
                amount: vec![0.0; sequence_length],
                delay: Duration::ZERO,
                fail: false,
                loads: Arc::new(AtomicUsize::new(0)),
                runs: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn with_scores(mut self, description: Vec<f32>, amount: Vec<f32>) -> Self {
            self.description = description;
            self.amount = amount;
            self
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        pub(crate) fn load_counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.loads)
        }

        /// Inference calls across every backend this loader builds.
        pub(crate) fn run_counter(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.runs)
        }
    }

    impl ModelLoader for FakeLoader {
        type Backend = FakeBackend;

        fn load(&self) -> rcpt_inference::Result<FakeBackend> {
            std::thread::sleep(self.delay);
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(InferenceError::ModelLoad("corrupt model".to_string()));
            }
            let mut backend = FakeBackend::new(
                self.sequence_length,
                self.description.clone(),
                self.amount.clone(),
            );
            backend.runs = Arc::clone(&self.runs);
            Ok(backend)
        }

        fn describe(&self) -> String {
            "memory".to_string()
        }
    }
}
