//! Token-scoring model with a signature discovered at load time.

use std::time::Instant;

use rcpt_inference::{InferenceBackend, InferenceError, InputTensor, OutputTensor, TensorInfo, TensorType};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{ReceiptError, Result};
use crate::models::receipt::ScorePair;
use crate::tokenizer::{tokenize, TokenizedText};

/// Input/output layout of a receipt scoring model.
///
/// Read from the model itself so that downstream buffers are sized from what
/// the loaded model version declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSignature {
    /// Required token sequence length `L`.
    pub sequence_length: usize,
    /// Name of the token id input.
    pub ids_input: String,
    /// Name of the attention mask input.
    pub mask_input: String,
    /// Element type of the token id input.
    #[serde(skip)]
    pub ids_type: TensorType,
    /// Element type of the attention mask input.
    #[serde(skip)]
    pub mask_type: TensorType,
    /// Declared shape of the description scores (`[1, L_desc]`).
    pub description_output: OutputSlot,
    /// Declared shape of the amount scores (`[1, L_amt]`).
    pub amount_output: OutputSlot,
}

/// A named output and its declared shape (`-1` for dynamic dimensions).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputSlot {
    pub name: String,
    pub shape: Vec<i64>,
}

impl From<&TensorInfo> for OutputSlot {
    fn from(info: &TensorInfo) -> Self {
        Self {
            name: info.name.clone(),
            shape: info.shape.clone(),
        }
    }
}

impl OutputSlot {
    fn expected_len(&self) -> Option<usize> {
        TensorInfo::new(self.name.clone(), None, self.shape.clone()).element_count()
    }
}

impl ModelSignature {
    /// Derive the signature from declared model inputs and outputs.
    ///
    /// The mask input is the one whose name mentions `mask`, otherwise the
    /// second input. `fallback_sequence_length` is only consulted when the
    /// token input has a dynamic sequence dimension.
    pub fn discover(
        inputs: &[TensorInfo],
        outputs: &[TensorInfo],
        fallback_sequence_length: Option<usize>,
    ) -> Result<Self> {
        if inputs.len() < 2 {
            return Err(ReceiptError::ModelLoad(format!(
                "expected token ids and attention mask inputs, model declares {}",
                inputs.len()
            )));
        }
        if outputs.len() < 2 {
            return Err(ReceiptError::ModelLoad(format!(
                "expected description and amount outputs, model declares {}",
                outputs.len()
            )));
        }

        let mask_idx = inputs
            .iter()
            .position(|i| i.name.to_lowercase().contains("mask"))
            .unwrap_or(1);
        let ids_idx = if mask_idx == 0 { 1 } else { 0 };
        let ids = &inputs[ids_idx];
        let mask = &inputs[mask_idx];

        let sequence_length = ids
            .dim(1)
            .or(fallback_sequence_length)
            .filter(|&len| len > 0)
            .ok_or_else(|| {
                ReceiptError::ModelLoad(format!(
                    "input '{}' has dynamic sequence length {:?} and no fallback is configured",
                    ids.name, ids.shape
                ))
            })?;

        Ok(Self {
            sequence_length,
            ids_input: ids.name.clone(),
            mask_input: mask.name.clone(),
            ids_type: ids.dtype.unwrap_or(TensorType::Int32),
            mask_type: mask.dtype.unwrap_or(TensorType::Int32),
            description_output: OutputSlot::from(&outputs[0]),
            amount_output: OutputSlot::from(&outputs[1]),
        })
    }
}

/// A loaded scoring model.
pub struct ReceiptModel<B: InferenceBackend> {
    backend: B,
    signature: ModelSignature,
}

impl<B: InferenceBackend> ReceiptModel<B> {
    /// Wrap a loaded backend, discovering its signature.
    pub fn new(backend: B, fallback_sequence_length: Option<usize>) -> Result<Self> {
        let signature =
            ModelSignature::discover(backend.inputs(), backend.outputs(), fallback_sequence_length)?;

        info!(
            "Scoring model ready: sequence length {}, outputs {:?} / {:?}",
            signature.sequence_length,
            signature.description_output.shape,
            signature.amount_output.shape
        );

        Ok(Self { backend, signature })
    }

    /// Discovered model signature.
    pub fn signature(&self) -> &ModelSignature {
        &self.signature
    }

    /// Token sequence length the model requires.
    pub fn sequence_length(&self) -> usize {
        self.signature.sequence_length
    }

    /// Tokenize a transcript at this model's sequence length.
    pub fn tokenize(&self, text: &str) -> TokenizedText {
        tokenize(text, self.signature.sequence_length)
    }

    /// Run the model on prepared tokens.
    ///
    /// Returns `(description_scores, amount_scores)`; their lengths follow the
    /// model outputs, not the input length.
    pub fn score(&self, tokens: &TokenizedText) -> Result<(Vec<f32>, Vec<f32>)> {
        let len = self.signature.sequence_length;
        for (name, values) in [
            (&self.signature.ids_input, &tokens.ids),
            (&self.signature.mask_input, &tokens.attention_mask),
        ] {
            if values.len() != len {
                return Err(InferenceError::ShapeMismatch {
                    tensor: name.clone(),
                    expected: vec![1, len as i64],
                    actual: vec![1, values.len()],
                }
                .into());
            }
        }

        let inputs = [
            (
                self.signature.ids_input.as_str(),
                InputTensor::row(&tokens.ids, self.signature.ids_type)?,
            ),
            (
                self.signature.mask_input.as_str(),
                InputTensor::row(&tokens.attention_mask, self.signature.mask_type)?,
            ),
        ];

        let outputs = self.backend.run(&inputs)?;

        let description = take_output(&outputs, &self.signature.description_output, 0)?;
        let amount = take_output(&outputs, &self.signature.amount_output, 1)?;

        Ok((description, amount))
    }

    /// Tokenize and score a transcript.
    pub fn analyze(&self, text: &str) -> Result<ScorePair> {
        let start = Instant::now();
        let tokens = self.tokenize(text);
        let (description_scores, amount_scores) = self.score(&tokens)?;

        debug!(
            "Scored {} chars ({} tokens) in {:?}",
            text.chars().count(),
            tokens.text_len(),
            start.elapsed()
        );

        Ok(ScorePair {
            original_text: text.to_string(),
            description_scores,
            amount_scores,
            tokenized_input: tokens.ids,
        })
    }
}

/// Pick an output by name (falling back to position) and check its size.
fn take_output(outputs: &[(String, OutputTensor)], slot: &OutputSlot, position: usize) -> Result<Vec<f32>> {
    let (_, tensor) = outputs
        .iter()
        .find(|(name, _)| *name == slot.name)
        .or_else(|| outputs.get(position))
        .ok_or_else(|| {
            InferenceError::OutputExtraction(format!("model returned no '{}' output", slot.name))
        })?;

    let scores = tensor.to_f32_vec();
    if let Some(expected) = slot.expected_len() {
        if scores.len() != expected {
            return Err(InferenceError::ShapeMismatch {
                tensor: slot.name.clone(),
                expected: slot.shape.clone(),
                actual: tensor.shape().to_vec(),
            }
            .into());
        }
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::testing::FakeBackend;
    use pretty_assertions::assert_eq;

    fn info(name: &str, dtype: TensorType, shape: &[i64]) -> TensorInfo {
        TensorInfo::new(name, Some(dtype), shape.to_vec())
    }

    #[test]
    fn test_discover_static_signature() {
        let inputs = [
            info("input_ids", TensorType::Int32, &[1, 128]),
            info("attention_mask", TensorType::Int32, &[1, 128]),
        ];
        let outputs = [
            info("description", TensorType::Float32, &[1, 128]),
            info("amount", TensorType::Float32, &[1, 64]),
        ];

        let signature = ModelSignature::discover(&inputs, &outputs, None).unwrap();
        assert_eq!(signature.sequence_length, 128);
        assert_eq!(signature.ids_input, "input_ids");
        assert_eq!(signature.mask_input, "attention_mask");
        assert_eq!(signature.amount_output.shape, vec![1, 64]);
    }

    #[test]
    fn test_discover_finds_mask_by_name() {
        let inputs = [
            info("mask", TensorType::Int64, &[1, 32]),
            info("tokens", TensorType::Int64, &[1, 32]),
        ];
        let outputs = [
            info("a", TensorType::Float32, &[1, 32]),
            info("b", TensorType::Float32, &[1, 32]),
        ];

        let signature = ModelSignature::discover(&inputs, &outputs, None).unwrap();
        assert_eq!(signature.ids_input, "tokens");
        assert_eq!(signature.mask_input, "mask");
        assert_eq!(signature.ids_type, TensorType::Int64);
    }

    #[test]
    fn test_discover_dynamic_length() {
        let inputs = [
            info("input_ids", TensorType::Int64, &[-1, -1]),
            info("attention_mask", TensorType::Int64, &[-1, -1]),
        ];
        let outputs = [
            info("d", TensorType::Float32, &[-1, -1]),
            info("a", TensorType::Float32, &[-1, -1]),
        ];

        let signature = ModelSignature::discover(&inputs, &outputs, Some(48)).unwrap();
        assert_eq!(signature.sequence_length, 48);

        let err = ModelSignature::discover(&inputs, &outputs, None).unwrap_err();
        assert!(matches!(err, ReceiptError::ModelLoad(_)));
    }

    #[test]
    fn test_discover_rejects_single_output() {
        let inputs = [
            info("input_ids", TensorType::Int32, &[1, 8]),
            info("attention_mask", TensorType::Int32, &[1, 8]),
        ];
        let outputs = [info("logits", TensorType::Float32, &[1, 8])];

        assert!(matches!(
            ModelSignature::discover(&inputs, &outputs, None),
            Err(ReceiptError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_analyze_returns_output_lengths_from_model() {
        // Output lengths deliberately differ from the input length
        let backend = FakeBackend::new(16, vec![0.5; 12], vec![0.25; 10]);
        let model = ReceiptModel::new(backend, None).unwrap();

        let pair = model.analyze("Coffee 2,50").unwrap();
        assert_eq!(pair.original_text, "Coffee 2,50");
        assert_eq!(pair.tokenized_input.len(), 16);
        assert_eq!(pair.description_scores.len(), 12);
        assert_eq!(pair.amount_scores.len(), 10);
    }

    #[test]
    fn test_analyze_sends_ids_and_mask_by_name() {
        let backend = FakeBackend::new(8, vec![0.0; 8], vec![0.0; 8]);
        let model = ReceiptModel::new(backend, None).unwrap();
        model.analyze("ab").unwrap();

        let seen = model.backend.last_inputs();
        assert_eq!(seen[0].0, "input_ids");
        assert_eq!(seen[0].1, vec![36, 37, 0, 0, 0, 0, 0, 0]);
        assert_eq!(seen[1].0, "attention_mask");
        assert_eq!(seen[1].1, vec![1, 1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_output_shape_mismatch_is_inference_error() {
        // Declares [1, 8] outputs but returns 5 scores
        let backend = FakeBackend::new(8, vec![0.0; 5], vec![0.0; 8]).with_declared_outputs(8, 8);
        let model = ReceiptModel::new(backend, None).unwrap();

        let err = model.analyze("total 1.00").unwrap_err();
        assert!(matches!(
            err,
            ReceiptError::Inference(InferenceError::ShapeMismatch { .. })
        ));
    }
}
