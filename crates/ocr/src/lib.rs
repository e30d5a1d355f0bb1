// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static regex::Regex {
            static R: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
            R.get_or_init(|| regex::Regex::new($pat).expect("invalid regex"))
        }
    };
}

pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod submission;
pub mod types;

pub use extract::Extractor;
pub use pipeline::{OcrResult, PipelineError, ReceiptPipeline};
pub use preprocess::{normalize, normalize_bytes, NormalizedImage, PreprocessError};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError, TesseractCli, UnavailableRecognizer};
pub use submission::{decode_data_url, SubmissionError};
pub use types::{
    EngineMode, ExtractedFields, LanguagePair, PageSegMode, RecognitionParams, RecognizedText,
};
