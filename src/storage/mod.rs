//! Storage abstractions for hike persistence.
//!
//! Records are keyed by canonical URL. An upsert replaces the whole record;
//! fields are never merged.
//!
//! ## Backends
//!
//! ```text
//! data/
//! ├── hikes.db      # SqliteStore: one row per hike
//! └── hikes.json    # JsonStore: one pretty-printed document, URL-keyed
//! ```

pub mod local;
pub mod sqlite;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::HikeRecord;

// Re-export for convenience
pub use local::JsonStore;
pub use sqlite::SqliteStore;

/// Trait for hike record backends.
#[async_trait]
pub trait HikeStore: Send + Sync {
    /// Insert or replace every record, keyed by URL, as a single unit.
    ///
    /// Returns the number of records written.
    async fn upsert_many(&self, hikes: &[HikeRecord]) -> Result<usize>;

    /// Every stored record, ordered by URL.
    async fn read_all(&self) -> Result<Vec<HikeRecord>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}

/// Open the backend matching a path: `.json` selects [`JsonStore`],
/// anything else [`SqliteStore`].
pub fn open_store(path: impl AsRef<Path>) -> Result<Box<dyn HikeStore>> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        Ok(Box::new(JsonStore::new(path)))
    } else {
        Ok(Box::new(SqliteStore::open(path)?))
    }
}
