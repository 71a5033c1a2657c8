//! Keyword heuristics that work on the transcript alone, without a model.

use super::normalize::clean_description;
use super::patterns::PRICE;
use super::{FALLBACK_DESCRIPTION, RELIABILITY_THRESHOLD};
use crate::models::receipt::DebugInfo;

/// Labels printed on the line before a receipt total.
const TOTAL_KEYWORDS: &[&str] = &[
    "TOTALE COMPLESSIVO",
    "Pagamento",
    "TOTALE",
    "IMPORTO",
    "TOTALE(EUR)",
    "TOTALE PAGATO",
    "PAGATO",
    "PAGAMENTO",
    "IMPORTO TOTALE",
    "TOT.",
];

/// Words that suggest a transcript came from a receipt.
const RECEIPT_KEYWORDS: &[&str] = &[
    "total", "totale", "receipt", "scontrino", "€", "$", "tax", "iva", "payment", "pagamento",
    "cash", "card",
];

/// Whether `line` contains a total label, ignoring case.
pub fn contains_total_keyword(line: &str) -> bool {
    let upper = line.to_uppercase();
    TOTAL_KEYWORDS
        .iter()
        .any(|keyword| upper.contains(&keyword.to_uppercase()))
}

/// Guess the receipt total from its lines.
///
/// Only the first line carrying a total label is considered: if the line after
/// it has any digits, its digits and dots (commas mapped to dots) are the
/// answer. Otherwise the largest `digits[.,]dd` anywhere in the text is used.
/// Returns an empty string when there is no price-shaped text at all.
pub fn extract_total_from_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let keyword_line = lines
        .iter()
        .position(|line| contains_total_keyword(line.as_ref()));

    if let Some(next) = keyword_line.and_then(|idx| lines.get(idx + 1)) {
        let candidate: String = next
            .as_ref()
            .replace(',', ".")
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if !candidate.is_empty() {
            return candidate;
        }
    }

    let mut best: Option<(f64, String)> = None;
    for line in lines {
        for m in PRICE.find_iter(line.as_ref()) {
            let text = m.as_str().replace(',', ".");
            let Ok(value) = text.parse::<f64>() else {
                continue;
            };
            match &best {
                Some((best_value, _)) if value <= *best_value => {}
                _ => best = Some((value, text)),
            }
        }
    }

    best.map(|(_, text)| text).unwrap_or_default()
}

/// [`extract_total_from_lines`] over a whole transcript.
pub fn extract_total(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    extract_total_from_lines(&lines)
}

/// Whether a transcript looks like a receipt: it mentions a receipt keyword
/// and contains a price.
pub fn is_receipt_like(text: &str) -> bool {
    let lower = text.to_lowercase();
    let has_keyword = RECEIPT_KEYWORDS.iter().any(|keyword| lower.contains(keyword));
    has_keyword && PRICE.is_match(text)
}

/// Whether a scoring pass is confident enough to trust.
pub fn reliability(info: &DebugInfo) -> bool {
    info.is_reliable_at(RELIABILITY_THRESHOLD)
}

/// First line that reads like a merchant or item name.
///
/// Total labels and lines that clean to nothing presentable are skipped.
pub fn guess_description<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    lines
        .iter()
        .map(AsRef::as_ref)
        .filter(|line| !contains_total_keyword(line))
        .map(clean_description)
        .find(|cleaned| cleaned != FALLBACK_DESCRIPTION)
}
