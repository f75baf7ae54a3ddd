//! Flux Text Parsing
//!
//! Tokens are separated by any run of commas and/or whitespace. Tokens that
//! do not parse as a float are skipped and counted; the minimum-length gate
//! in [`crate::SeriesValidator`] is what rejects input with nothing usable.

use tracing::debug;

const BOM: char = '\u{feff}';
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Outcome of parsing a text blob
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedText {
    /// Values in input order
    pub values: Vec<f64>,
    /// Non-empty tokens that failed to parse
    pub skipped: usize,
}

/// Parse comma/whitespace separated floats, skipping unparseable tokens.
pub fn parse_flux_text(text: &str) -> Vec<f64> {
    parse_flux_text_report(text).values
}

/// Parse like [`parse_flux_text`] and report how many tokens were skipped.
pub fn parse_flux_text_report(text: &str) -> ParsedText {
    let text = text.strip_prefix(BOM).unwrap_or(text);

    let mut parsed = ParsedText::default();
    for token in text
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        match token.parse::<f64>() {
            Ok(v) => parsed.values.push(v),
            Err(_) => parsed.skipped += 1,
        }
    }

    if parsed.skipped > 0 {
        debug!(
            values = parsed.values.len(),
            skipped = parsed.skipped,
            "Skipped unparseable flux tokens"
        );
    }
    parsed
}

/// Decode uploaded bytes as UTF-8, dropping a leading BOM and any invalid
/// byte sequences.
pub fn decode_upload(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect()
}
