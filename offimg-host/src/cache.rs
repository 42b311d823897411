//! LRU read-through cache in front of a slower content store

use lru::LruCache;
use offimg_core::store::Capability;
use offimg_core::{ContentStore, StoreError};
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Keeps recently read or written records in memory. Records are keyed
/// by content hash, so a cached entry never goes stale.
pub struct CachedStore<S> {
    inner: S,
    cache: Mutex<LruCache<String, Vec<u8>>>,
}

impl<S: ContentStore> CachedStore<S> {
    /// Wrap `inner` with a cache of `capacity` records (at least one)
    pub fn new(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of cached records
    pub fn cached_len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn cache(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, Vec<u8>>>, StoreError> {
        self.cache.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl<S: ContentStore> ContentStore for CachedStore<S> {
    fn supports(&self, capability: Capability) -> bool {
        self.inner.supports(capability)
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.cache()?.clear();
        self.inner.clear()
    }

    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(bytes) = self.cache()?.get(key) {
            return Ok(Some(bytes.clone()));
        }

        let bytes = self.inner.get_item(key)?;
        if let Some(bytes) = &bytes {
            self.cache()?.put(key.to_string(), bytes.clone());
        }
        Ok(bytes)
    }

    fn set_item(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.inner.set_item(key, bytes)?;
        self.cache()?.put(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        self.cache()?.pop(key);
        self.inner.delete_item(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offimg_core::store::{CallbackStore, MemoryStore};
    use offimg_core::StoreHandle;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_read_through_and_hit() {
        let memory = Arc::new(MemoryStore::new());
        memory.set_item("k", b"v").unwrap();
        let cached = CachedStore::new(Arc::clone(&memory), 2);

        assert_eq!(cached.cached_len(), 0);
        assert_eq!(cached.get_item("k").unwrap().as_deref(), Some(&b"v"[..]));
        assert_eq!(cached.cached_len(), 1);

        // Served from cache even after the backing record disappears
        memory.delete_item("k").unwrap();
        assert!(cached.get_item("k").unwrap().is_some());
    }

    #[test]
    fn test_miss_is_not_cached() {
        let cached = CachedStore::new(MemoryStore::new(), 2);
        assert_eq!(cached.get_item("missing").unwrap(), None);
        assert_eq!(cached.cached_len(), 0);
    }

    #[test]
    fn test_delete_evicts() {
        let cached = CachedStore::new(MemoryStore::new(), 2);
        cached.set_item("k", b"v").unwrap();
        cached.delete_item("k").unwrap();
        assert_eq!(cached.get_item("k").unwrap(), None);
    }

    #[test]
    fn test_capacity_bounds_entries() {
        let cached = CachedStore::new(MemoryStore::new(), 2);
        for key in ["a", "b", "c"] {
            cached.set_item(key, key.as_bytes()).unwrap();
        }
        assert_eq!(cached.cached_len(), 2);
        // Evicted entries are still in the backing store
        assert!(cached.get_item("a").unwrap().is_some());
    }

    #[test]
    fn test_zero_capacity_still_works() {
        let cached = CachedStore::new(MemoryStore::new(), 0);
        cached.set_item("k", b"v").unwrap();
        assert_eq!(cached.cached_len(), 1);
    }

    #[test]
    fn test_cache_avoids_repeated_backend_reads() {
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let backend = CallbackStore::new()
            .on_clear(|| Ok(()))
            .on_get_item(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Some(b"bytes".to_vec()))
            })
            .on_set_item(|_, _| Ok(()))
            .on_delete_item(|_| Ok(()));
        let cached = CachedStore::new(backend, 4);

        cached.get_item("k").unwrap();
        cached.get_item("k").unwrap();
        assert_eq!(reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_forwards_missing_capability() {
        let incomplete = CallbackStore::new().on_clear(|| Ok(()));
        let err = StoreHandle::new(CachedStore::new(incomplete, 4)).unwrap_err();
        assert_eq!(err.missing, Capability::GetItem);
    }
}
