//! Local JSON file backend.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use gradeboard_core::error::StoreError;
use gradeboard_core::traits::LedgerStore;

/// Stores the ledger as a pretty-printed JSON file.
///
/// Writes go to a temporary file in the same directory and are renamed
/// into place, so readers never observe a half-written document.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LedgerStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get(&self) -> anyhow::Result<Option<Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(None),
            Ok(content) => {
                let value = serde_json::from_str(&content).map_err(|e| {
                    StoreError::Malformed(format!("{}: {e}", self.path.display()))
                })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(StoreError::Unavailable(format!("{}: {e}", self.path.display())).into())
            }
        }
    }

    #[instrument(skip(self, document), fields(path = %self.path.display()))]
    async fn set(&self, document: &Value) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(document).context("failed to serialize ledger")?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .context("file write task panicked")??;
        tracing::debug!("ledger written");
        Ok(())
    }
}

fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let unavailable = |e: std::io::Error| StoreError::Unavailable(format!("{}: {e}", path.display()));

    std::fs::create_dir_all(dir).map_err(unavailable)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(unavailable)?;
    tmp.write_all(contents.as_bytes()).map_err(unavailable)?;
    tmp.persist(path).map_err(|e| unavailable(e.error))?;
    Ok(())
}
