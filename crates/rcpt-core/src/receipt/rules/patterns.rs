//! Common regex patterns for receipt field extraction.
//!
//! Digit classes are ASCII-only, matching what the amount parser accepts.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Amount candidates scored by the model: "12.5", "12,50"
    pub static ref SCORED_AMOUNT: Regex = Regex::new(r"[0-9]+[.,][0-9]{1,2}").unwrap();

    // Dot-decimal amount, after commas were normalized
    pub static ref DECIMAL_AMOUNT: Regex = Regex::new(r"[0-9]+\.[0-9]{1,2}").unwrap();

    pub static ref INTEGER: Regex = Regex::new(r"[0-9]+").unwrap();

    // Printed prices always carry two decimals
    pub static ref PRICE: Regex = Regex::new(r"[0-9]+[.,][0-9]{2}").unwrap();

    // OCR artifacts and currency symbols dropped from descriptions
    pub static ref DESCRIPTION_NOISE: Regex = Regex::new(r"[*#@€$]+").unwrap();

    pub static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    pub static ref NUMERIC_ONLY: Regex = Regex::new(r"^[0-9.,]+$").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_patterns() {
        assert!(SCORED_AMOUNT.is_match("12,5"));
        assert!(!SCORED_AMOUNT.is_match("12"));
        assert!(PRICE.is_match("TOTALE 3,90"));
        assert!(!PRICE.is_match("3,9"));
        assert_eq!(DECIMAL_AMOUNT.find("12.345").unwrap().as_str(), "12.34");
    }

    #[test]
    fn test_numeric_only() {
        assert!(NUMERIC_ONLY.is_match("12.50"));
        assert!(NUMERIC_ONLY.is_match("1,000.00"));
        assert!(!NUMERIC_ONLY.is_match("12 50"));
        assert!(!NUMERIC_ONLY.is_match(""));
    }
}
