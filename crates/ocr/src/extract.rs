use crate::types::{ExtractedFields, RecognizedText};

// A run of non-digits followed, optionally after whitespace, by a run of digits.
re!(re_item_amount, r"(\D+)\s*(\d+)");

pub struct Extractor;

impl Extractor {
    /// Derive `{item, amount}` from the first non-blank line that matches.
    ///
    /// Lines are scanned in order and scanning stops at the first match, even
    /// when a later line would match too. No match yields empty fields.
    pub fn extract(text: &RecognizedText) -> ExtractedFields {
        text.lines()
            .iter()
            .map(String::as_str)
            .filter(|line| !line.trim().is_empty())
            .find_map(Self::match_line)
            .unwrap_or_default()
    }

    fn match_line(line: &str) -> Option<ExtractedFields> {
        let c = re_item_amount().captures(line)?;
        Some(ExtractedFields {
            item: c.get(1)?.as_str().trim().to_string(),
            amount: c.get(2)?.as_str().to_string(),
        })
    }
}
