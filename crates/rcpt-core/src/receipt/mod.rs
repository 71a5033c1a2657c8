//! Receipt field extraction.

mod extractor;
mod pipeline;
pub mod rules;

pub use extractor::{CombinedExtractor, HeuristicExtractor, ModelExtractor};
pub use pipeline::{BatchItem, ReceiptPipeline};

use crate::error::Result;
use crate::models::receipt::{DebugInfo, ReceiptFields};

/// One way of turning an OCR transcript into receipt fields.
///
/// Finding nothing is not an error: implementations return the fallback
/// description and an empty amount instead.
pub trait ReceiptExtractor {
    /// Extract description and amount from a transcript.
    fn extract(&self, ocr_text: &str) -> Result<ReceiptFields>;

    /// Extract fields along with the model scores they came from, if any.
    ///
    /// Extractors that score the text return the [`DebugInfo`] of the same
    /// model run their fields were built from.
    fn extract_with_debug(&self, ocr_text: &str) -> Result<(ReceiptFields, Option<DebugInfo>)> {
        Ok((self.extract(ocr_text)?, None))
    }

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}
