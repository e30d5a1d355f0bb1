use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::extract::Extractor;
use crate::preprocess::{self, PreprocessError};
use crate::recognizer::{OcrBackend, OcrError};
use crate::submission::{self, SubmissionError};
use crate::types::{ExtractedFields, RecognitionParams, RecognizedText};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid image submission: {0}")]
    InvalidInput(#[from] SubmissionError),
    #[error("Image could not be decoded: {0}")]
    Decode(#[from] PreprocessError),
    #[error("OCR is unavailable: {0}")]
    OcrUnavailable(String),
    #[error("OCR execution failed: {0}")]
    OcrExecution(String),
}

impl From<OcrError> for PipelineError {
    fn from(e: OcrError) -> Self {
        match e {
            OcrError::NotAvailable(reason) => PipelineError::OcrUnavailable(reason),
            other => PipelineError::OcrExecution(other.to_string()),
        }
    }
}

/// The result of a single receipt processing run.
#[derive(Debug)]
pub struct OcrResult {
    /// Raw OCR output, line by line.
    pub text: RecognizedText,
    pub fields: ExtractedFields,
}

/// Orchestrates: decode → normalize → OCR → extract.
///
/// Transport details stop at the boundary: JSON data URLs go through
/// [`ReceiptPipeline::process_data_url`], uploaded files straight to
/// [`ReceiptPipeline::process_bytes`].
#[derive(Clone)]
pub struct ReceiptPipeline {
    recognizer: Arc<dyn OcrBackend>,
    params: RecognitionParams,
    timeout: Option<Duration>,
}

impl ReceiptPipeline {
    pub fn new(recognizer: impl OcrBackend + 'static, params: RecognitionParams) -> Self {
        Self {
            recognizer: Arc::new(recognizer),
            params,
            timeout: None,
        }
    }

    /// Bound the time the OCR engine may spend on one image.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_ocr_available(&self) -> bool {
        self.recognizer.check_available().is_ok()
    }

    pub fn backend_name(&self) -> &str {
        self.recognizer.name()
    }

    pub async fn process_data_url(&self, payload: &str) -> Result<OcrResult, PipelineError> {
        let bytes = submission::decode_data_url(payload)?;
        self.process_bytes(bytes).await
    }

    /// Process encoded image bytes (camera capture or uploaded file).
    pub async fn process_bytes(&self, data: Vec<u8>) -> Result<OcrResult, PipelineError> {
        self.recognizer.check_available()?;
        if data.is_empty() {
            return Err(SubmissionError::Missing.into());
        }

        // 1. Normalize; CPU bound, so off the async workers. OCR is never
        //    attempted on a failed normalization.
        let image = tokio::task::spawn_blocking(move || preprocess::normalize_bytes(&data))
            .await
            .map_err(|e| PipelineError::OcrExecution(format!("worker failed: {e}")))??;

        // 2. Run OCR. Dropping the future on timeout stops the engine.
        let recognition = self.recognizer.recognize(&image, &self.params);
        let text = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, recognition).await.map_err(|_| {
                PipelineError::OcrExecution(format!("timed out after {}s", limit.as_secs_f32()))
            })??,
            None => recognition.await?,
        };

        // 3. Extract fields.
        let fields = Extractor::extract(&text);

        debug!(
            width = image.width(),
            height = image.height(),
            lines = text.len(),
            matched = !fields.is_empty(),
            "Receipt recognized"
        );
        Ok(OcrResult { text, fields })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
