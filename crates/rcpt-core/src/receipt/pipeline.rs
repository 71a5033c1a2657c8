//! Receipt pipeline: one transcript at a time, or a sequential batch of images.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{ReceiptError, Result};
use crate::models::config::{ExtractionConfig, ExtractionStrategy};
use crate::models::receipt::{DebugInfo, ReceiptFields};
use crate::ocr::OcrProvider;
use crate::scoring::{ModelHandle, ModelLoader};

use super::extractor::{CombinedExtractor, HeuristicExtractor, ModelExtractor};
use super::rules::{ERROR_DESCRIPTION, NO_TEXT_DESCRIPTION};
use super::ReceiptExtractor;

/// Outcome for one image of a batch.
#[derive(Debug, Clone)]
pub struct BatchItem<'a, I> {
    /// The image this result belongs to.
    pub image: &'a I,
    /// Extracted fields, or the error marker for a failed item.
    pub fields: ReceiptFields,
    /// Why the item failed, if it did.
    pub error: Option<String>,
}

impl<I> BatchItem<'_, I> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Owns the model handle and the configured extraction strategy.
pub struct ReceiptPipeline<L: ModelLoader> {
    handle: Arc<ModelHandle<L>>,
    config: ExtractionConfig,
    extractor: Box<dyn ReceiptExtractor + Send + Sync>,
}

impl<L: ModelLoader + 'static> ReceiptPipeline<L> {
    /// Create a pipeline. The model is loaded on first use.
    pub fn new(loader: L, config: ExtractionConfig) -> Self {
        Self::with_handle(Arc::new(ModelHandle::new(loader)), config)
    }

    /// Create a pipeline around an existing handle.
    pub fn with_handle(handle: Arc<ModelHandle<L>>, config: ExtractionConfig) -> Self {
        let extractor: Box<dyn ReceiptExtractor + Send + Sync> = match config.strategy {
            ExtractionStrategy::Model => {
                Box::new(ModelExtractor::new(Arc::clone(&handle), config.clone()))
            }
            ExtractionStrategy::Heuristic => Box::new(HeuristicExtractor::new(config.clone())),
            ExtractionStrategy::Combined => {
                Box::new(CombinedExtractor::new(Arc::clone(&handle), config.clone()))
            }
        };

        debug!("Receipt pipeline using {} extraction", extractor.name());

        Self {
            handle,
            config,
            extractor,
        }
    }

    /// The shared model handle.
    pub fn handle(&self) -> &Arc<ModelHandle<L>> {
        &self.handle
    }

    /// Load the model now instead of on first use.
    pub fn acquire(&self) -> Result<()> {
        self.handle.acquire()
    }

    /// Free the model. The next scoring call reloads it.
    pub fn release(&self) -> bool {
        self.handle.release()
    }

    /// Extract description and amount from one OCR transcript.
    ///
    /// A blank transcript yields `("No text found in image", "")` without
    /// running any extractor.
    pub fn process_receipt(&self, ocr_text: &str) -> Result<ReceiptFields> {
        if ocr_text.trim().is_empty() {
            return Ok(ReceiptFields::new(NO_TEXT_DESCRIPTION, ""));
        }
        self.extractor.extract(ocr_text)
    }

    /// Model scores and confidence summaries for one transcript.
    pub fn debug_info(&self, ocr_text: &str) -> Result<DebugInfo> {
        ModelExtractor::new(Arc::clone(&self.handle), self.config.clone()).debug_info(ocr_text)
    }

    /// [`process_receipt`](Self::process_receipt) plus the model scores.
    ///
    /// Model-backed strategies score the text once and build both results
    /// from that run; the heuristic strategy scores it only for the report.
    /// Blank text has no scores.
    pub fn process_receipt_with_debug(
        &self,
        ocr_text: &str,
    ) -> Result<(ReceiptFields, Option<DebugInfo>)> {
        if ocr_text.trim().is_empty() {
            return Ok((ReceiptFields::new(NO_TEXT_DESCRIPTION, ""), None));
        }

        let (fields, info) = self.extractor.extract_with_debug(ocr_text)?;
        let info = match info {
            Some(info) => info,
            None => self.debug_info(ocr_text)?,
        };
        Ok((fields, Some(info)))
    }

    /// Run OCR and extraction over `images`, one at a time.
    ///
    /// A failing image does not stop the batch: it is reported with the
    /// `"Error processing image"` marker and its error message. `progress` is
    /// called with `(done, total)` after every item. Only a model that cannot
    /// be loaded aborts the batch, before any image is read.
    pub fn process_batch<'a, O: OcrProvider>(
        &self,
        ocr: &O,
        images: &'a [O::Image],
        mut progress: Option<&mut dyn FnMut(usize, usize)>,
    ) -> Result<Vec<BatchItem<'a, O::Image>>> {
        if self.config.strategy != ExtractionStrategy::Heuristic {
            self.handle.acquire()?;
        }

        let start = Instant::now();
        let total = images.len();
        let mut items = Vec::with_capacity(total);

        for (index, image) in images.iter().enumerate() {
            let outcome = ocr
                .recognize(image)
                .map_err(ReceiptError::from)
                .and_then(|text| self.process_receipt(&text));

            items.push(match outcome {
                Ok(fields) => BatchItem {
                    image,
                    fields,
                    error: None,
                },
                Err(e) => {
                    warn!("Batch item {}/{} failed: {}", index + 1, total, e);
                    BatchItem {
                        image,
                        fields: ReceiptFields::new(ERROR_DESCRIPTION, ""),
                        error: Some(e.to_string()),
                    }
                }
            });

            if let Some(callback) = progress.as_deref_mut() {
                callback(index + 1, total);
            }
        }

        let failed = items.iter().filter(|item| item.is_error()).count();
        info!(
            "Processed {} receipts ({} failed) in {:?}",
            total,
            failed,
            start.elapsed()
        );

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::scoring::testing::FakeLoader;
    use pretty_assertions::assert_eq;

    /// Returns the image name as its transcript; names starting with `bad`
    /// fail to read.
    struct ScriptedOcr;

    impl OcrProvider for ScriptedOcr {
        type Image = String;

        fn recognize(&self, image: &String) -> std::result::Result<String, OcrError> {
            if image.starts_with("bad") {
                Err(OcrError::InvalidImage(format!("cannot decode {}", image)))
            } else {
                Ok(image.clone())
            }
        }
    }

    fn heuristic() -> ExtractionConfig {
        ExtractionConfig {
            strategy: ExtractionStrategy::Heuristic,
            ..ExtractionConfig::default()
        }
    }

    #[test]
    fn test_blank_text_skips_the_model() {
        let loader = FakeLoader::new(32);
        let loads = loader.load_counter();
        let pipeline = ReceiptPipeline::new(loader, ExtractionConfig::default());

        let fields = pipeline.process_receipt("  \n\t ").unwrap();
        assert_eq!(fields, ReceiptFields::new(NO_TEXT_DESCRIPTION, ""));
        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let pipeline = ReceiptPipeline::new(FakeLoader::new(32), ExtractionConfig::default());
        let images: Vec<String> = vec![
            "BAR SPORT\nTOTALE\n3,40".to_string(),
            "bad.jpg".to_string(),
            "EDICOLA\n2,00".to_string(),
            "".to_string(),
        ];

        let mut calls = Vec::new();
        let mut record = |done: usize, total: usize| calls.push((done, total));
        let items = pipeline
            .process_batch(&ScriptedOcr, &images, Some(&mut record))
            .unwrap();

        assert_eq!(items.len(), 4);
        assert_eq!(calls, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);

        assert!(items[1].is_error());
        assert_eq!(items[1].image, "bad.jpg");
        assert_eq!(items[1].fields, ReceiptFields::new(ERROR_DESCRIPTION, ""));
        assert!(items[1].error.as_deref().unwrap().contains("cannot decode"));

        assert!(!items[0].is_error());
        assert!(!items[2].is_error());
        assert_eq!(items[3].fields.description, NO_TEXT_DESCRIPTION);
    }

    #[test]
    fn test_batch_without_progress() {
        let pipeline = ReceiptPipeline::new(FakeLoader::new(16).failing(), heuristic());
        let images = vec!["BAR SPORT\nTOTALE\n3,40".to_string()];

        let items = pipeline.process_batch(&ScriptedOcr, &images, None).unwrap();
        assert_eq!(items[0].fields, ReceiptFields::new("BAR SPORT", "3.40"));
        assert!(!pipeline.handle().is_loaded());
    }

    #[test]
    fn test_batch_model_load_failure_is_fatal() {
        let pipeline = ReceiptPipeline::new(FakeLoader::new(16).failing(), ExtractionConfig::default());
        let images = vec!["TOTALE\n1,00".to_string()];

        let mut calls = 0;
        let mut count = |_: usize, _: usize| calls += 1;
        let err = pipeline
            .process_batch(&ScriptedOcr, &images, Some(&mut count))
            .unwrap_err();

        assert!(matches!(err, ReceiptError::ModelLoad(_)));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_release_and_reload() {
        let loader = FakeLoader::new(16);
        let loads = loader.load_counter();
        let pipeline = ReceiptPipeline::new(loader, ExtractionConfig::default());

        pipeline.process_receipt("caffe 1,00").unwrap();
        assert!(pipeline.release());
        pipeline.process_receipt("caffe 1,00").unwrap();

        assert_eq!(loads.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_run_scores_text_once() {
        let text = "BAR SPORT\nTOTALE 3,40";
        for strategy in [
            ExtractionStrategy::Model,
            ExtractionStrategy::Combined,
            ExtractionStrategy::Heuristic,
        ] {
            let loader = FakeLoader::new(32);
            let runs = loader.run_counter();
            let config = ExtractionConfig {
                strategy,
                ..ExtractionConfig::default()
            };
            let pipeline = ReceiptPipeline::new(loader, config);

            let (fields, info) = pipeline.process_receipt_with_debug(text).unwrap();
            assert_eq!(fields, pipeline.process_receipt(text).unwrap());
            assert_eq!(info.unwrap().tokenized_length, 32);

            let expected = if strategy == ExtractionStrategy::Heuristic { 1 } else { 2 };
            assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), expected, "{:?}", strategy);
        }
    }

    #[test]
    fn test_debug_run_on_blank_text() {
        let loader = FakeLoader::new(16);
        let runs = loader.run_counter();
        let pipeline = ReceiptPipeline::new(loader, ExtractionConfig::default());

        let (fields, info) = pipeline.process_receipt_with_debug("   ").unwrap();
        assert_eq!(fields.description, NO_TEXT_DESCRIPTION);
        assert!(info.is_none());
        assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_debug_info_loads_model_for_heuristic_pipeline() {
        let pipeline = ReceiptPipeline::new(FakeLoader::new(16), heuristic());
        let info = pipeline.debug_info("caffe 1,00").unwrap();
        assert_eq!(info.tokenized_length, 16);
        assert!(pipeline.handle().is_loaded());
    }
}
