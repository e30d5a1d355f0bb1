use kakeibo_ocr::{ReceiptPipeline, TesseractCli, UnavailableRecognizer};
use kakeibo_storage::LedgerStore;
use std::sync::Arc;
use tracing::warn;

use crate::config::{OcrConfig, ServerConfig};

/// Shared across handlers. The pipeline is stateless; the store owns the
/// single writer lock.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ReceiptPipeline,
    pub store: Arc<LedgerStore>,
}

impl AppState {
    pub fn new(pipeline: ReceiptPipeline, store: LedgerStore) -> Self {
        Self {
            pipeline,
            store: Arc::new(store),
        }
    }

    /// Detect the OCR engine and open the ledger named by `config`.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            build_pipeline(&config.ocr),
            LedgerStore::new(&config.data_file),
        )
    }
}

/// Without a usable engine the pipeline runs in degraded mode: OCR routes
/// answer 503 while ledger routes keep working.
pub fn build_pipeline(config: &OcrConfig) -> ReceiptPipeline {
    let params = config.recognition.clone();
    let pipeline = match TesseractCli::detect(config.tesseract_path.as_deref()) {
        Ok(cli) => ReceiptPipeline::new(cli, params),
        Err(e) => {
            warn!(error = %e, "OCR disabled; serving ledger routes only");
            ReceiptPipeline::new(UnavailableRecognizer::new(e.to_string()), params)
        }
    };
    match config.timeout() {
        Some(limit) => pipeline.with_timeout(limit),
        None => pipeline,
    }
}
