//! Receipt data models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw model output for one receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    /// OCR transcript the scores were computed from.
    pub original_text: String,

    /// Per-position "part of description" scores (raw logits).
    pub description_scores: Vec<f32>,

    /// Per-position "part of amount" scores (raw logits).
    pub amount_scores: Vec<f32>,

    /// Token ids submitted to the model.
    pub tokenized_input: Vec<i64>,
}

/// Best-guess description and amount for a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFields {
    /// Title-cased description, at most 50 characters, or a sentinel.
    pub description: String,

    /// Two-decimal amount in `(0, 99999]`, or empty when none was found.
    pub amount: String,
}

impl ReceiptFields {
    pub fn new(description: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            amount: amount.into(),
        }
    }

    /// Whether an amount was extracted.
    pub fn has_amount(&self) -> bool {
        !self.amount.is_empty()
    }
}

/// Diagnostic view of a single scoring pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugInfo {
    pub scores: ScorePair,
    pub tokenized_length: usize,
    pub description_confidence_avg: f32,
    pub amount_confidence_avg: f32,
    pub max_description_confidence: f32,
    pub max_amount_confidence: f32,
    /// Description before normalization.
    pub extracted_description: String,
    /// Amount before normalization.
    pub extracted_amount: String,
    pub reliable: bool,
}

impl DebugInfo {
    /// Summarize a score pair. `threshold` is the peak score both fields must exceed.
    pub fn new(
        scores: ScorePair,
        extracted_description: String,
        extracted_amount: String,
        threshold: f32,
    ) -> Self {
        let mut info = Self {
            tokenized_length: scores.tokenized_input.len(),
            description_confidence_avg: mean(&scores.description_scores),
            amount_confidence_avg: mean(&scores.amount_scores),
            max_description_confidence: peak(&scores.description_scores),
            max_amount_confidence: peak(&scores.amount_scores),
            scores,
            extracted_description,
            extracted_amount,
            reliable: false,
        };
        info.reliable = info.is_reliable_at(threshold);
        info
    }

    /// Both peak confidences strictly exceed `threshold`.
    pub fn is_reliable_at(&self, threshold: f32) -> bool {
        self.max_description_confidence > threshold && self.max_amount_confidence > threshold
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

fn peak(values: &[f32]) -> f32 {
    values.iter().copied().reduce(f32::max).unwrap_or(0.0)
}

/// One expense record as persisted by a [`crate::sink::RowSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub date: NaiveDate,
    pub description: String,
    pub amount: String,
    pub currency: String,
    pub category: String,
    pub method: String,
}

impl Expense {
    /// Build an expense from extracted fields plus caller-supplied columns.
    pub fn from_fields(
        fields: &ReceiptFields,
        date: NaiveDate,
        currency: impl Into<String>,
        category: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            date,
            description: fields.description.clone(),
            amount: fields.amount.clone(),
            currency: currency.into(),
            category: category.into(),
            method: method.into(),
        }
    }

    /// Sheet columns: date, description, amount, currency, category, method.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.description.clone(),
            self.amount.clone(),
            self.currency.clone(),
            self.category.clone(),
            self.method.clone(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scores(description: Vec<f32>, amount: Vec<f32>) -> ScorePair {
        ScorePair {
            original_text: "coffee 2.50".to_string(),
            description_scores: description,
            amount_scores: amount,
            tokenized_input: vec![0; 8],
        }
    }

    #[test]
    fn test_debug_info_summaries() {
        let info = DebugInfo::new(
            scores(vec![0.1, 0.5, 0.3], vec![-1.0, 1.0]),
            "coffee".to_string(),
            "2.50".to_string(),
            0.3,
        );

        assert_eq!(info.tokenized_length, 8);
        assert!((info.description_confidence_avg - 0.3).abs() < 1e-6);
        assert_eq!(info.amount_confidence_avg, 0.0);
        assert_eq!(info.max_description_confidence, 0.5);
        assert_eq!(info.max_amount_confidence, 1.0);
        assert!(info.reliable);
    }

    #[test]
    fn test_debug_info_unreliable_when_one_peak_is_low() {
        let info = DebugInfo::new(
            scores(vec![0.9], vec![0.3]),
            String::new(),
            String::new(),
            0.3,
        );
        // Threshold is exclusive
        assert!(!info.reliable);

        let empty = DebugInfo::new(scores(vec![], vec![]), String::new(), String::new(), 0.3);
        assert_eq!(empty.max_description_confidence, 0.0);
        assert!(!empty.reliable);
    }

    #[test]
    fn test_expense_row_order() {
        let fields = ReceiptFields::new("Coffee shop", "4.20");
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let expense = Expense::from_fields(&fields, date, "EUR", "Food", "card");

        assert_eq!(
            expense.to_row(),
            vec!["2024-03-07", "Coffee shop", "4.20", "EUR", "Food", "card"]
        );
    }
}
