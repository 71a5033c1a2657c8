//! Character-level tokenizer for OCR transcripts.
//!
//! The vocabulary is closed: after normalization a transcript only contains
//! `a-z`, `0-9`, space, `.`, `,`, `€` and `$`. Ids are assigned as
//!
//! | char      | id        |
//! |-----------|-----------|
//! | padding   | 0         |
//! | space     | 1         |
//! | `.`       | 2         |
//! | `,`       | 3         |
//! | `€`       | 4         |
//! | `$`       | 5         |
//! | `0`..`9`  | 10..19    |
//! | `a`..`z`  | 36..61    |

/// Token id used for padding positions.
pub const PAD_ID: i64 = 0;

/// Fixed-length model input derived from a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizedText {
    /// Normalized text, truncated to the sequence length.
    pub normalized: String,
    /// Token ids, always exactly `max_len` long.
    pub ids: Vec<i64>,
    /// 1 for positions holding text, 0 for padding.
    pub attention_mask: Vec<i64>,
}

impl TokenizedText {
    /// Number of positions holding real text.
    pub fn text_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

/// Lower-case, blank out characters outside the vocabulary, collapse
/// whitespace and trim.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;

    for c in lowered.chars() {
        let keep = c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | ',' | '€' | '$');
        if keep {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }

    out
}

/// Token id for one normalized character.
pub fn token_id(c: char) -> i64 {
    match c {
        '0'..='9' => 10 + (c as i64 - '0' as i64),
        'a'..='z' => 36 + (c as i64 - 'a' as i64),
        ' ' => 1,
        '.' => 2,
        ',' => 3,
        '€' => 4,
        '$' => 5,
        _ => PAD_ID,
    }
}

/// Tokenize `text` into exactly `max_len` ids plus the matching attention mask.
///
/// Total over all inputs: an empty transcript yields an all-zero sequence.
pub fn tokenize(text: &str, max_len: usize) -> TokenizedText {
    let normalized: String = normalize(text).chars().take(max_len).collect();

    let mut ids = vec![PAD_ID; max_len];
    let mut attention_mask = vec![0; max_len];
    for (i, c) in normalized.chars().enumerate() {
        ids[i] = token_id(c);
        attention_mask[i] = 1;
    }

    TokenizedText {
        normalized,
        ids,
        attention_mask,
    }
}
