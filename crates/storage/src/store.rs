use kakeibo_core::{Category, Ledger, LedgerEntry};
use std::ffi::{OsStr, OsString};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Ledger file {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Ledger file {path} is not a valid ledger: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode ledger: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Whole-file JSON persistence for a [`Ledger`].
///
/// Every save rewrites the complete file through a sibling temp file and a
/// rename. `append` holds a writer lock across load, append and save so
/// concurrent appends through the same store never lose entries.
pub struct LedgerStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LedgerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger; a missing file yields an empty ledger with both known categories.
    pub async fn load(&self) -> Result<Ledger, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Ledger file absent; starting empty");
                return Ok(Ledger::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let ledger: Ledger = serde_json::from_slice(&bytes).map_err(|source| {
            warn!(path = %self.path.display(), error = %source, "Ledger file is corrupt");
            StorageError::Corrupt {
                path: self.path.clone(),
                source,
            }
        })?;

        debug!(path = %self.path.display(), entries = ledger.len(), "Loaded ledger");
        Ok(ledger)
    }

    /// Overwrite the ledger file with `ledger`.
    ///
    /// Encoding happens before the file is touched; the target is replaced by
    /// rename only after the temp file is fully written and synced.
    pub async fn save(&self, ledger: &Ledger) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec_pretty(ledger).map_err(StorageError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }

        let tmp = self.temp_path();
        if let Err(e) = write_synced(&tmp, &encoded).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }
        if let Err(e) = fs::rename(&tmp, &self.path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(self.io_error(e));
        }

        debug!(path = %self.path.display(), entries = ledger.len(), "Saved ledger");
        Ok(())
    }

    /// Load, append `entry` under `category`, and save, as one serialized step.
    pub async fn append(
        &self,
        category: Category,
        entry: LedgerEntry,
    ) -> Result<Ledger, StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut ledger = self.load().await?;
        ledger.append(category, entry);
        self.save(&ledger).await?;
        Ok(ledger)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(self.path.file_name().unwrap_or(OsStr::new("ledger")));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}
