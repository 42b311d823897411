//! offimg host - editor runtime for offline image nodes
//!
//! This crate contains everything that touches threads or the filesystem:
//! - Editor state and the completion loop
//! - Drop events and the ingestion pipeline
//! - Store worker thread and stored-content resolution
//! - Directory-backed and cached content stores

pub mod cache;
pub mod dir_store;
pub mod editor;
pub mod error;
pub mod event;
pub mod ingest;
pub mod sniff;
pub mod store_worker;

use anyhow::{Context, Result};
use offimg_core::{Config, StoreHandle};

// Re-export main types
pub use cache::CachedStore;
pub use dir_store::DirStore;
pub use editor::Editor;
pub use error::{IngestError, ResolveError};
pub use event::{Coords, CoordinateMap, DropEvent, DropHandling, DroppedFile, FileSource};

/// Open the configured directory store behind a read cache
pub fn open_store(config: &Config) -> Result<StoreHandle> {
    let dir = config
        .store_dir()
        .context("No store directory configured and no platform data directory found")?;
    let store = DirStore::open(&dir)?;
    let handle = StoreHandle::new(CachedStore::new(store, config.store.cache_capacity))
        .with_context(|| format!("Store at {} is unusable", dir.display()))?;
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store.dir = Some(tmp.path().join("nested").join("store"));

        let store = open_store(&config).unwrap();
        store.set_item("abcd", b"bytes").unwrap();
        assert!(tmp.path().join("nested/store/ab/abcd").is_file());
    }
}
