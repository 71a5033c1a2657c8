//! Presentable forms of extracted strings.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{DECIMAL_AMOUNT, DESCRIPTION_NOISE, INTEGER, NUMERIC_ONLY, WHITESPACE};
use super::{FALLBACK_DESCRIPTION, MAX_AMOUNT, MAX_DESCRIPTION_LEN};

/// Clean a description, capping it at 50 characters.
pub fn clean_description(raw: &str) -> String {
    clean_description_within(raw, MAX_DESCRIPTION_LEN)
}

/// Strip OCR noise from a description and capitalize it.
///
/// Anything without at least two characters and one letter left becomes
/// [`FALLBACK_DESCRIPTION`].
pub fn clean_description_within(raw: &str, max_len: usize) -> String {
    let stripped = DESCRIPTION_NOISE.replace_all(raw.trim(), "");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    let cleaned = if NUMERIC_ONLY.is_match(&collapsed) {
        ""
    } else {
        collapsed.trim()
    };

    if cleaned.chars().count() < 2 || !cleaned.chars().any(char::is_alphabetic) {
        return FALLBACK_DESCRIPTION.to_string();
    }

    let mut chars = cleaned.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    capitalized.chars().take(max_len).collect()
}

/// Clean an amount, accepting values in `(0, 99999]`.
pub fn clean_amount(raw: &str) -> String {
    clean_amount_within(raw, Decimal::from(MAX_AMOUNT))
}

/// Normalize an amount to a two-decimal string.
///
/// The first `digits.d{1,2}` (after mapping `,` to `.`) is the candidate; the
/// first bare integer is used only when there is no such match. The candidate
/// is accepted only if `0 < value <= max`. Anything else yields an empty
/// string, so the function is idempotent.
pub fn clean_amount_within(raw: &str, max: Decimal) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let normalized = raw.replace(',', ".");
    let normalized = normalized.trim();

    DECIMAL_AMOUNT
        .find(normalized)
        .or_else(|| INTEGER.find(normalized))
        .and_then(|m| accept_amount(m.as_str(), max))
        .unwrap_or_default()
}

fn accept_amount(candidate: &str, max: Decimal) -> Option<String> {
    let value = Decimal::from_str(candidate).ok()?;
    (value > Decimal::ZERO && value <= max).then(|| format!("{:.2}", value))
}
