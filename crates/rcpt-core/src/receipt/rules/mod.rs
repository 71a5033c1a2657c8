//! Rule-based building blocks for receipt extraction.

pub mod heuristics;
pub mod normalize;
pub mod patterns;
pub mod window;

pub use heuristics::{
    contains_total_keyword, extract_total, extract_total_from_lines, guess_description,
    is_receipt_like, reliability,
};
pub use normalize::{clean_amount, clean_amount_within, clean_description, clean_description_within};
pub use window::{extract_amount, extract_description, extract_description_with_window};

/// Description used when nothing presentable was found.
pub const FALLBACK_DESCRIPTION: &str = "Receipt Item";

/// Description reported for a blank OCR transcript.
pub const NO_TEXT_DESCRIPTION: &str = "No text found in image";

/// Description reported for a batch item that failed.
pub const ERROR_DESCRIPTION: &str = "Error processing image";

/// Width of the description window, in characters.
pub const DESCRIPTION_WINDOW: usize = 20;

/// Longest description kept after cleaning, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 50;

/// Largest accepted amount (inclusive).
pub const MAX_AMOUNT: u32 = 99_999;

/// Peak score both fields must exceed for an extraction to be reliable.
pub const RELIABILITY_THRESHOLD: f32 = 0.3;
