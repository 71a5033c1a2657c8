//! Turn per-position model scores into description and amount strings.
//!
//! Score positions are aligned with characters of the original transcript
//! (not bytes), so all offsets here are character offsets.

use super::patterns::SCORED_AMOUNT;
use super::{DESCRIPTION_WINDOW, FALLBACK_DESCRIPTION};

/// Best-scoring 20-character span of `original_text`.
pub fn extract_description(original_text: &str, scores: &[f32]) -> String {
    extract_description_with_window(original_text, scores, DESCRIPTION_WINDOW)
}

/// Slide a `window`-wide span over the text and keep the one with the highest
/// mean score.
///
/// Window starts range over `[0, min(scores, chars) - window)`. On equal means
/// the earliest window wins. If no window fits, or the chosen span is blank,
/// the result is [`FALLBACK_DESCRIPTION`].
pub fn extract_description_with_window(original_text: &str, scores: &[f32], window: usize) -> String {
    let chars: Vec<char> = original_text.chars().collect();
    let limit = scores.len().min(chars.len());

    if window == 0 || limit <= window {
        return FALLBACK_DESCRIPTION.to_string();
    }

    let mut best: Option<(usize, f32)> = None;
    for start in 0..limit - window {
        let score = mean(&scores[start..start + window]);
        match best {
            Some((_, best_score)) if score <= best_score => {}
            // NaN never beats an existing window
            Some(_) if score.is_nan() => {}
            _ => best = Some((start, score)),
        }
    }

    let Some((start, _)) = best else {
        return FALLBACK_DESCRIPTION.to_string();
    };
    let end = (start + window).min(chars.len());
    let span: String = chars[start..end].iter().collect();
    let span = span.trim();

    if span.is_empty() {
        FALLBACK_DESCRIPTION.to_string()
    } else {
        span.to_string()
    }
}

/// Amount-shaped substring with the highest mean amount score.
///
/// Candidates are `digits[.,]d{1,2}`. A candidate's confidence is the mean of
/// the scores it covers; positions past the end of `scores` are ignored and a
/// candidate with no covered position scores 0. On equal confidence the
/// leftmost candidate wins. Commas are returned as dots; no candidate yields
/// an empty string.
pub fn extract_amount(original_text: &str, scores: &[f32]) -> String {
    let mut best: Option<(f32, &str)> = None;

    // Byte offsets from the regex are converted to character offsets as we go
    let mut scanned_bytes = 0;
    let mut scanned_chars = 0;

    for m in SCORED_AMOUNT.find_iter(original_text) {
        scanned_chars += original_text[scanned_bytes..m.start()].chars().count();
        scanned_bytes = m.start();

        let start = scanned_chars;
        let end = (start + m.as_str().chars().count()).min(scores.len());
        let confidence = if start < end { mean(&scores[start..end]) } else { 0.0 };

        match best {
            Some((best_confidence, _)) if confidence <= best_confidence => {}
            // NaN never beats an existing candidate
            Some(_) if confidence.is_nan() => {}
            _ => best = Some((confidence, m.as_str())),
        }
    }

    best.map(|(_, value)| value.replace(',', "."))
        .unwrap_or_default()
}

fn mean(values: &[f32]) -> f32 {
    values.iter().sum::<f32>() / values.len() as f32
}
