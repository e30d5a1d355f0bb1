use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::preprocess::NormalizedImage;
use crate::types::{RecognitionParams, RecognizedText};

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),
    #[error("Failed to run OCR engine: {0}")]
    Launch(#[source] std::io::Error),
    #[error("OCR engine exited with {status}: {stderr}")]
    Engine { status: String, stderr: String },
    #[error("OCR engine returned non UTF-8 text")]
    InvalidOutput,
    #[error("Failed to encode image for OCR: {0}")]
    Encode(String),
}

/// Abstraction over an OCR backend.
/// Implementations take a normalized bitmap and return the recognized lines.
/// Dropping the returned future must abandon the recognition.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn recognize(
        &self,
        image: &NormalizedImage,
        params: &RecognitionParams,
    ) -> Result<RecognizedText, OcrError>;

    /// Fails with [`OcrError::NotAvailable`] when the engine was not found
    /// at startup.
    fn check_available(&self) -> Result<(), OcrError> {
        Ok(())
    }

    fn name(&self) -> &str;
}

#[async_trait]
impl<T: OcrBackend + ?Sized> OcrBackend for Arc<T> {
    async fn recognize(
        &self,
        image: &NormalizedImage,
        params: &RecognitionParams,
    ) -> Result<RecognizedText, OcrError> {
        (**self).recognize(image, params).await
    }

    fn check_available(&self) -> Result<(), OcrError> {
        (**self).check_available()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string, so the pipeline can be exercised without
/// Tesseract installed.
#[derive(Debug, Clone)]
pub struct MockRecognizer {
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl OcrBackend for MockRecognizer {
    async fn recognize(
        &self,
        _image: &NormalizedImage,
        _params: &RecognitionParams,
    ) -> Result<RecognizedText, OcrError> {
        Ok(RecognizedText::from_raw(&self.text))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ── Degraded mode ─────────────────────────────────────────────────────────────

/// Stands in for an engine that could not be found at startup.
#[derive(Debug, Clone)]
pub struct UnavailableRecognizer {
    reason: String,
}

impl UnavailableRecognizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl OcrBackend for UnavailableRecognizer {
    async fn recognize(
        &self,
        _image: &NormalizedImage,
        _params: &RecognitionParams,
    ) -> Result<RecognizedText, OcrError> {
        Err(OcrError::NotAvailable(self.reason.clone()))
    }

    fn check_available(&self) -> Result<(), OcrError> {
        Err(OcrError::NotAvailable(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unavailable"
    }
}

// ── Tesseract command-line backend ────────────────────────────────────────────

#[cfg(windows)]
const TESSERACT_EXE: &str = "tesseract.exe";
#[cfg(not(windows))]
const TESSERACT_EXE: &str = "tesseract";

/// Runs the `tesseract` executable once per image: PNG on stdin, text on stdout.
/// `detect` runs synchronously and is meant for startup only.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: PathBuf,
}

impl TesseractCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }

    /// Resolve the executable once: `configured` if given, otherwise the first
    /// match on `PATH`. The engine must answer `--version` to count as present.
    pub fn detect(configured: Option<&Path>) -> Result<Self, OcrError> {
        let program = match configured {
            Some(path) => path.to_path_buf(),
            None => find_on_path(TESSERACT_EXE).ok_or_else(|| {
                OcrError::NotAvailable(format!("`{TESSERACT_EXE}` not found on PATH"))
            })?,
        };

        let output = std::process::Command::new(&program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                OcrError::NotAvailable(format!("cannot execute {}: {e}", program.display()))
            })?;
        if !output.status.success() {
            return Err(OcrError::NotAvailable(format!(
                "{} --version exited with {}",
                program.display(),
                output.status
            )));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() { &output.stderr } else { &output.stdout };
        let version = String::from_utf8_lossy(banner);
        info!(
            program = %program.display(),
            version = version.lines().next().unwrap_or("").trim(),
            "Tesseract detected"
        );
        Ok(Self { program })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

fn command_args(params: &RecognitionParams) -> Vec<String> {
    vec![
        "stdin".into(),
        "stdout".into(),
        "-l".into(),
        params.languages.to_string(),
        "--psm".into(),
        params.page_segmentation.as_arg().into(),
        "--oem".into(),
        params.engine_mode.as_arg().into(),
    ]
}

fn find_on_path(exe: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(exe))
        .find(|candidate| candidate.is_file())
}

#[async_trait]
impl OcrBackend for TesseractCli {
    async fn recognize(
        &self,
        image: &NormalizedImage,
        params: &RecognitionParams,
    ) -> Result<RecognizedText, OcrError> {
        let png = image.to_png().map_err(|e| OcrError::Encode(e.to_string()))?;
        let args = command_args(params);
        debug!(
            program = %self.program.display(),
            ?args,
            bytes = png.len(),
            "Invoking tesseract"
        );

        // The child is killed if this future is dropped, e.g. on timeout.
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(OcrError::Launch)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).await.map_err(OcrError::Launch)?;
        }
        let output = child.wait_with_output().await.map_err(OcrError::Launch)?;

        if !output.status.success() {
            return Err(OcrError::Engine {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = String::from_utf8(output.stdout).map_err(|_| OcrError::InvalidOutput)?;
        Ok(RecognizedText::from_raw(&text))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::normalize;
    use crate::types::{EngineMode, LanguagePair, PageSegMode};
    use image::DynamicImage;

    fn blank() -> NormalizedImage {
        normalize(&DynamicImage::new_luma8(4, 4)).unwrap()
    }

    #[tokio::test]
    async fn mock_returns_preset_lines() {
        let r = MockRecognizer::new("コーヒー 350\n合計 350");
        let text = r.recognize(&blank(), &RecognitionParams::default()).await.unwrap();
        assert_eq!(text.lines(), &["コーヒー 350", "合計 350"]);
        assert!(r.check_available().is_ok());
    }

    #[tokio::test]
    async fn unavailable_always_reports_not_available() {
        let r = UnavailableRecognizer::new("tesseract missing");
        assert!(r.check_available().is_err());
        let err = r.recognize(&blank(), &RecognitionParams::default()).await.unwrap_err();
        assert!(matches!(err, OcrError::NotAvailable(reason) if reason == "tesseract missing"));
    }

    #[test]
    fn arc_backend_delegates() {
        let r: Arc<dyn OcrBackend> = Arc::new(UnavailableRecognizer::new("x"));
        assert!(matches!(r.check_available(), Err(OcrError::NotAvailable(_))));
        assert_eq!(r.name(), "unavailable");
    }

    #[test]
    fn command_args_for_default_params() {
        assert_eq!(
            command_args(&RecognitionParams::default()),
            vec!["stdin", "stdout", "-l", "jpn+eng", "--psm", "6", "--oem", "1"]
        );
    }

    #[test]
    fn command_args_follow_params() {
        let params = RecognitionParams {
            languages: LanguagePair { primary: "eng".into(), secondary: "osd".into() },
            page_segmentation: PageSegMode::SingleLine,
            engine_mode: EngineMode::EngineDefault,
        };
        assert_eq!(
            command_args(&params),
            vec!["stdin", "stdout", "-l", "eng+osd", "--psm", "7", "--oem", "3"]
        );
    }

    #[test]
    fn detect_with_missing_program_is_not_available() {
        let err =
            TesseractCli::detect(Some(Path::new("/nonexistent/bin/tesseract"))).unwrap_err();
        assert!(matches!(err, OcrError::NotAvailable(_)));
    }
}
