use kakeibo_core::LedgerEntry;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered lines of text returned by the OCR engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecognizedText {
    lines: Vec<String>,
}

impl RecognizedText {
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { lines: lines.into_iter().map(Into::into).collect() }
    }

    /// Split raw engine output into lines.
    ///
    /// Breaks on `\n`, `\r\n`, `\r` and the other Unicode line boundaries
    /// (vertical tab, form feed, file/group/record separators, NEL, LS, PS).
    /// Tesseract terminates every page with a form feed, so that one matters.
    pub fn from_raw(raw: &str) -> Self {
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                    }
                    lines.push(std::mem::take(&mut current));
                }
                '\n' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}'
                | '\u{2028}' | '\u{2029}' => lines.push(std::mem::take(&mut current)),
                other => current.push(other),
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// The (item, amount) pair derived from a receipt. Both fields are always
/// present in the serialized form, empty when nothing matched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub item: String,
    pub amount: String,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.item.is_empty() && self.amount.is_empty()
    }
}

impl From<ExtractedFields> for LedgerEntry {
    fn from(fields: ExtractedFields) -> Self {
        LedgerEntry { item: fields.item, amount: fields.amount }
    }
}

/// Two Tesseract language packs requested together, e.g. `jpn+eng`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePair {
    pub primary: String,
    pub secondary: String,
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self { primary: "jpn".into(), secondary: "eng".into() }
    }
}

impl fmt::Display for LanguagePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.primary, self.secondary)
    }
}

/// Tesseract `--psm` values relevant to receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSegMode {
    Auto,
    SingleColumn,
    /// A single uniform block of text.
    #[default]
    SingleBlock,
    SingleLine,
    SparseText,
}

impl PageSegMode {
    pub fn as_arg(self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleLine => "7",
            PageSegMode::SparseText => "11",
        }
    }
}

/// Tesseract `--oem` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    Legacy,
    #[default]
    Lstm,
    LegacyAndLstm,
    EngineDefault,
}

impl EngineMode {
    pub fn as_arg(self) -> &'static str {
        match self {
            EngineMode::Legacy => "0",
            EngineMode::Lstm => "1",
            EngineMode::LegacyAndLstm => "2",
            EngineMode::EngineDefault => "3",
        }
    }
}

/// Everything the OCR engine is told besides the image itself.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionParams {
    pub languages: LanguagePair,
    pub page_segmentation: PageSegMode,
    pub engine_mode: EngineMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_splits_on_all_line_boundaries() {
        let t = RecognizedText::from_raw("a\nb\r\nc\rd\x0ce");
        assert_eq!(t.lines(), &["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn from_raw_drops_only_the_trailing_terminator() {
        let t = RecognizedText::from_raw("コーヒー 350\n\n\x0c");
        assert_eq!(t.lines(), &["コーヒー 350", "", ""]);
        assert!(RecognizedText::from_raw("").is_empty());
    }

    #[test]
    fn default_params_request_jpn_eng_uniform_block() {
        let p = RecognitionParams::default();
        assert_eq!(p.languages.to_string(), "jpn+eng");
        assert_eq!(p.page_segmentation.as_arg(), "6");
        assert_eq!(p.engine_mode.as_arg(), "1");
    }

    #[test]
    fn extracted_fields_serialize_both_keys_when_empty() {
        let json = serde_json::to_value(ExtractedFields::default()).unwrap();
        assert_eq!(json, serde_json::json!({ "item": "", "amount": "" }));
    }

    #[test]
    fn extracted_fields_convert_to_ledger_entry() {
        let entry: LedgerEntry = ExtractedFields { item: "パン".into(), amount: "200".into() }.into();
        assert_eq!(entry, LedgerEntry::new("パン", "200"));
    }

    #[test]
    fn params_fill_missing_fields_with_defaults() {
        let p: RecognitionParams =
            serde_json::from_str(r#"{"page_segmentation":"sparse_text"}"#).unwrap();
        assert_eq!(p.page_segmentation, PageSegMode::SparseText);
        assert_eq!(p.engine_mode, EngineMode::Lstm);
    }
}
