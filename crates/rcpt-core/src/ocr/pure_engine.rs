//! Receipt OCR on `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).

use std::path::{Path, PathBuf};
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::{OcrProvider, OcrResult, TextBox};

/// PaddleOCR detection + recognition models run through `pure-onnx-ocr`.
pub struct PureOcrEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
    keep_unk: bool,
}

impl PureOcrEngine {
    /// Load the models named in `config` from `config.model_dir`.
    pub fn from_config(config: &OcrConfig) -> Result<Self, OcrError> {
        Self::from_paths(
            &config.model_dir.join(&config.detection_model),
            &config.model_dir.join(&config.recognition_model),
            &config.model_dir.join(&config.dictionary),
            config.keep_unk,
        )
    }

    /// Load `det.onnx`, `latin_rec.onnx` and `latin_dict.txt` from a directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self, OcrError> {
        let config = OcrConfig {
            model_dir: model_dir.to_path_buf(),
            ..OcrConfig::default()
        };
        Self::from_config(&config)
    }

    fn from_paths(det: &Path, rec: &Path, dict: &Path, keep_unk: bool) -> Result<Self, OcrError> {
        for path in [det, rec, dict] {
            if !path.exists() {
                return Err(OcrError::ModelLoad(format!(
                    "OCR model file not found: {}",
                    path.display()
                )));
            }
        }

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(det)
            .rec_model_path(rec)
            .dictionary_path(dict)
            .build()
            .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded OCR engine ({}, {})", det.display(), rec.display());

        Ok(Self { engine, keep_unk })
    }

    /// Recognize an image, returning boxes in reading order.
    pub fn process(&self, image: &DynamicImage) -> Result<OcrResult, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage(format!("empty image {}x{}", width, height)));
        }

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

        debug!("pure-onnx-ocr returned {} text regions", results.len());

        let boxes = results
            .iter()
            .map(|r| TextBox {
                bbox: polygon_to_bbox(&r.bounding_box),
                text: if self.keep_unk {
                    r.text.clone()
                } else {
                    r.text.replace("[UNK]", " ")
                },
                confidence: r.confidence,
            })
            .collect();

        let result = OcrResult::from_boxes(boxes, (width, height), start.elapsed().as_millis() as u64);

        info!(
            "OCR complete: {} lines from {}x{} in {}ms",
            result.boxes.len(),
            width,
            height,
            result.processing_time_ms
        );

        Ok(result)
    }

    /// Open an image file and recognize it.
    pub fn process_file(&self, path: &Path) -> Result<OcrResult, OcrError> {
        let image = image::open(path)
            .map_err(|e| OcrError::InvalidImage(format!("{}: {}", path.display(), e)))?;
        self.process(&image)
    }
}

impl OcrProvider for PureOcrEngine {
    type Image = PathBuf;

    fn recognize(&self, image: &PathBuf) -> Result<String, OcrError> {
        Ok(self.process_file(image)?.text)
    }
}

/// First four exterior points of a polygon as `[x1, y1, ..., x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
