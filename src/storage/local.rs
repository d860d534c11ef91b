//! Local JSON snapshot storage implementation.
//!
//! Keeps every record in one pretty-printed document:
//!
//! ```text
//! {
//!   "count": 2,
//!   "hikes": {
//!     "https://randoromandie.com/2025/12/24/bulle": { ... },
//!     "https://randoromandie.com/2026/01/15/aigle": { ... }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::HikeRecord;
use crate::storage::HikeStore;

/// On-disk document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    count: usize,
    hikes: BTreeMap<String, HikeRecord>,
}

/// JSON file storage backend.
pub struct JsonStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Create a store backed by the given file. Nothing is touched until the
    /// first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read the snapshot, empty if the file doesn't exist.
    async fn read_snapshot(&self) -> Result<Snapshot> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl HikeStore for JsonStore {
    async fn upsert_many(&self, hikes: &[HikeRecord]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot = self.read_snapshot().await?;
        for hike in hikes {
            snapshot.hikes.insert(hike.url.clone(), hike.clone());
        }
        snapshot.count = snapshot.hikes.len();

        let mut bytes = serde_json::to_vec_pretty(&snapshot)?;
        bytes.push(b'\n');
        self.write_bytes(&bytes)
            .await
            .inspect_err(|e| log::error!("Failed to write {}: {}", self.path.display(), e))?;

        log::debug!("Upserted {} hikes into {}", hikes.len(), self.path.display());
        Ok(hikes.len())
    }

    async fn read_all(&self) -> Result<Vec<HikeRecord>> {
        let snapshot = self.read_snapshot().await?;
        if snapshot.hikes.is_empty() {
            log::warn!("No hikes found in {}", self.path.display());
        }
        Ok(snapshot.hikes.into_values().collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read_snapshot().await?.hikes.len())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
