//! Model-based and heuristic extractors.

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::config::ExtractionConfig;
use crate::models::receipt::{DebugInfo, ReceiptFields, ScorePair};
use crate::scoring::{ModelHandle, ModelLoader};

use super::rules::{
    clean_amount_within, clean_description_within, extract_amount, extract_description_with_window,
    extract_total_from_lines, guess_description, FALLBACK_DESCRIPTION,
};
use super::ReceiptExtractor;

/// Extracts fields from the scoring model's per-position scores.
pub struct ModelExtractor<L: ModelLoader> {
    handle: Arc<ModelHandle<L>>,
    settings: ExtractionConfig,
}

impl<L: ModelLoader> ModelExtractor<L> {
    pub fn new(handle: Arc<ModelHandle<L>>, settings: ExtractionConfig) -> Self {
        Self { handle, settings }
    }

    /// Score a transcript, loading the model on first use.
    pub fn scores(&self, ocr_text: &str) -> Result<ScorePair> {
        self.handle.with_model(|model| model.analyze(ocr_text))
    }

    /// Raw description and amount picked from the scores, before cleanup.
    pub fn select(&self, scores: &ScorePair) -> (String, String) {
        let description = extract_description_with_window(
            &scores.original_text,
            &scores.description_scores,
            self.settings.description_window,
        );
        let amount = extract_amount(&scores.original_text, &scores.amount_scores);
        (description, amount)
    }

    /// Scores, confidence summaries and raw picks for one transcript.
    pub fn debug_info(&self, ocr_text: &str) -> Result<DebugInfo> {
        let scores = self.scores(ocr_text)?;
        let (description, amount) = self.select(&scores);
        Ok(DebugInfo::new(
            scores,
            description,
            amount,
            self.settings.reliability_threshold,
        ))
    }

    fn clean(&self, description: &str, amount: &str) -> ReceiptFields {
        ReceiptFields::new(
            clean_description_within(description, self.settings.max_description_len),
            clean_amount_within(amount, Decimal::from(self.settings.max_amount)),
        )
    }
}

impl<L: ModelLoader> ReceiptExtractor for ModelExtractor<L> {
    fn extract(&self, ocr_text: &str) -> Result<ReceiptFields> {
        let start = Instant::now();
        let scores = self.scores(ocr_text)?;
        let (description, amount) = self.select(&scores);
        let fields = self.clean(&description, &amount);

        debug!(
            "Model extraction: {:?} / {:?} in {:?}",
            fields.description,
            fields.amount,
            start.elapsed()
        );
        Ok(fields)
    }

    fn extract_with_debug(&self, ocr_text: &str) -> Result<(ReceiptFields, Option<DebugInfo>)> {
        let info = self.debug_info(ocr_text)?;
        let fields = self.clean(&info.extracted_description, &info.extracted_amount);
        Ok((fields, Some(info)))
    }

    fn name(&self) -> &'static str {
        "model"
    }
}

/// Keyword and regex extraction; never touches the model.
#[derive(Debug, Clone, Default)]
pub struct HeuristicExtractor {
    settings: ExtractionConfig,
}

impl HeuristicExtractor {
    pub fn new(settings: ExtractionConfig) -> Self {
        Self { settings }
    }
}

impl ReceiptExtractor for HeuristicExtractor {
    fn extract(&self, ocr_text: &str) -> Result<ReceiptFields> {
        let lines: Vec<&str> = ocr_text.lines().collect();

        let description = guess_description(&lines)
            .map(|d| d.chars().take(self.settings.max_description_len).collect())
            .unwrap_or_else(|| FALLBACK_DESCRIPTION.to_string());
        let amount = clean_amount_within(
            &extract_total_from_lines(&lines),
            Decimal::from(self.settings.max_amount),
        );

        Ok(ReceiptFields::new(description, amount))
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Model extraction cross-checked against the heuristics.
///
/// The model result wins. An empty model amount is filled from the keyword
/// total and a fallback description from the first presentable line.
pub struct CombinedExtractor<L: ModelLoader> {
    model: ModelExtractor<L>,
    heuristic: HeuristicExtractor,
}

impl<L: ModelLoader> CombinedExtractor<L> {
    pub fn new(handle: Arc<ModelHandle<L>>, settings: ExtractionConfig) -> Self {
        Self {
            heuristic: HeuristicExtractor::new(settings.clone()),
            model: ModelExtractor::new(handle, settings),
        }
    }

    fn reconcile(&self, mut fields: ReceiptFields, ocr_text: &str) -> Result<ReceiptFields> {
        let fallback = self.heuristic.extract(ocr_text)?;

        if !fields.has_amount() {
            fields.amount = fallback.amount;
        } else if fallback.has_amount() && fallback.amount != fields.amount {
            warn!(
                "Model amount {} disagrees with keyword total {}",
                fields.amount, fallback.amount
            );
        }

        if fields.description == FALLBACK_DESCRIPTION {
            fields.description = fallback.description;
        }

        Ok(fields)
    }
}

impl<L: ModelLoader> ReceiptExtractor for CombinedExtractor<L> {
    fn extract(&self, ocr_text: &str) -> Result<ReceiptFields> {
        let fields = self.model.extract(ocr_text)?;
        self.reconcile(fields, ocr_text)
    }

    fn extract_with_debug(&self, ocr_text: &str) -> Result<(ReceiptFields, Option<DebugInfo>)> {
        let (fields, info) = self.model.extract_with_debug(ocr_text)?;
        Ok((self.reconcile(fields, ocr_text)?, info))
    }

    fn name(&self) -> &'static str {
        "combined"
    }
}
