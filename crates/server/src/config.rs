//! Server configuration: optional TOML file, then environment overrides.
//!
//! Resolved once at startup and passed explicitly to the pipeline and store.

use kakeibo_ocr::RecognitionParams;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Env var naming the config file.
pub const CONFIG_ENV: &str = "KAKEIBO_CONFIG";
/// Config file read from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "kakeibo.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// The ledger JSON file.
    pub data_file: PathBuf,
    /// Upper bound on request bodies, uploads included.
    pub max_body_bytes: usize,
    /// Allow cross-origin requests from any origin.
    pub cors_permissive: bool,
    pub ocr: OcrConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            data_file: PathBuf::from("data.json"),
            max_body_bytes: 20 * 1024 * 1024,
            cors_permissive: false,
            ocr: OcrConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Explicit engine path; `PATH` is searched when unset.
    pub tesseract_path: Option<PathBuf>,
    /// Per-image limit in seconds; 0 disables it.
    pub timeout_secs: u64,
    #[serde(flatten)]
    pub recognition: RecognitionParams,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            timeout_secs: 60,
            recognition: RecognitionParams::default(),
        }
    }
}

impl OcrConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl ServerConfig {
    /// Load from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(&std::env::vars().collect())
    }

    /// `KAKEIBO_CONFIG` (or `kakeibo.toml` if it exists), then env overrides.
    /// An explicitly named file must exist; the default file is optional.
    pub fn load_with(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = match env.get(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("No config file; using defaults");
                Self::default()
            }
        };
        config.apply_env(env)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<(), ConfigError> {
        if let Some(host) = env.get("KAKEIBO_HOST") {
            self.host = host.clone();
        }
        if let Some(port) = env.get("PORT") {
            self.port = parse_env("PORT", port)?;
        }
        if let Some(path) = env.get("KAKEIBO_DATA_FILE") {
            self.data_file = PathBuf::from(path);
        }
        if let Some(path) = env.get("KAKEIBO_TESSERACT") {
            self.ocr.tesseract_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = env.get("KAKEIBO_OCR_TIMEOUT_SECS") {
            self.ocr.timeout_secs = parse_env("KAKEIBO_OCR_TIMEOUT_SECS", secs)?;
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}
