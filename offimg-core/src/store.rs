//! Content-addressable store contract
//!
//! Image bytes live outside the document, keyed by their content hash. A
//! store is injected once and validated eagerly through [`StoreHandle::new`]
//! before any document work happens. Store calls may be slow, so the host
//! runtime only invokes them from worker threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::error::{IncompatibleStoreError, StoreError};

/// One of the four operations a content store must provide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Clear,
    GetItem,
    SetItem,
    DeleteItem,
}

impl Capability {
    /// Validation order
    pub const ALL: [Capability; 4] = [
        Capability::Clear,
        Capability::GetItem,
        Capability::SetItem,
        Capability::DeleteItem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Capability::Clear => "clear",
            Capability::GetItem => "getItem",
            Capability::SetItem => "setItem",
            Capability::DeleteItem => "deleteItem",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte storage keyed by content hash
pub trait ContentStore: Send + Sync {
    /// Whether the store implements `capability`. Stores built from
    /// concrete types implement everything.
    fn supports(&self, _capability: Capability) -> bool {
        true
    }

    fn clear(&self) -> Result<(), StoreError>;

    /// `Ok(None)` is a store miss, not an error
    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn set_item(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn delete_item(&self, key: &str) -> Result<(), StoreError>;
}

/// Check that `store` provides all four operations
pub fn validate(store: &dyn ContentStore) -> Result<(), IncompatibleStoreError> {
    match Capability::ALL.into_iter().find(|cap| !store.supports(*cap)) {
        Some(missing) => Err(IncompatibleStoreError { missing }),
        None => Ok(()),
    }
}

/// A validated, shareable store
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<dyn ContentStore>,
}

impl StoreHandle {
    /// Validate and wrap a store
    pub fn new(store: impl ContentStore + 'static) -> Result<Self, IncompatibleStoreError> {
        Self::from_arc(Arc::new(store))
    }

    pub fn from_arc(store: Arc<dyn ContentStore>) -> Result<Self, IncompatibleStoreError> {
        validate(store.as_ref())?;
        debug!("content store validated");
        Ok(Self { inner: store })
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.inner.clear()
    }

    pub fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get_item(key)
    }

    pub fn set_item(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.inner.set_item(key, bytes)
    }

    pub fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete_item(key)
    }
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items
            .lock()
            .map(|items| items.contains_key(key))
            .unwrap_or(false)
    }
}

impl ContentStore for MemoryStore {
    fn clear(&self) -> Result<(), StoreError> {
        self.items.lock().map_err(|_| StoreError::Poisoned)?.clear();
        Ok(())
    }

    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let items = self.items.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut items = self.items.lock().map_err(|_| StoreError::Poisoned)?;
        items.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        self.items.lock().map_err(|_| StoreError::Poisoned)?.remove(key);
        Ok(())
    }
}

impl<S: ContentStore + ?Sized> ContentStore for Arc<S> {
    fn supports(&self, capability: Capability) -> bool {
        (**self).supports(capability)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }

    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).set_item(key, bytes)
    }

    fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete_item(key)
    }
}

type ClearFn = Box<dyn Fn() -> Result<(), StoreError> + Send + Sync>;
type GetFn = Box<dyn Fn(&str) -> Result<Option<Vec<u8>>, StoreError> + Send + Sync>;
type SetFn = Box<dyn Fn(&str, &[u8]) -> Result<(), StoreError> + Send + Sync>;
type DeleteFn = Box<dyn Fn(&str) -> Result<(), StoreError> + Send + Sync>;

/// A store assembled from individual callbacks, for hosts that expose
/// storage as a bag of functions. Missing callbacks are caught by
/// [`validate`].
#[derive(Default)]
pub struct CallbackStore {
    clear: Option<ClearFn>,
    get_item: Option<GetFn>,
    set_item: Option<SetFn>,
    delete_item: Option<DeleteFn>,
}

impl CallbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_clear<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<(), StoreError> + Send + Sync + 'static,
    {
        self.clear = Some(Box::new(f));
        self
    }

    pub fn on_get_item<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<Option<Vec<u8>>, StoreError> + Send + Sync + 'static,
    {
        self.get_item = Some(Box::new(f));
        self
    }

    pub fn on_set_item<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[u8]) -> Result<(), StoreError> + Send + Sync + 'static,
    {
        self.set_item = Some(Box::new(f));
        self
    }

    pub fn on_delete_item<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> Result<(), StoreError> + Send + Sync + 'static,
    {
        self.delete_item = Some(Box::new(f));
        self
    }
}

impl ContentStore for CallbackStore {
    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Clear => self.clear.is_some(),
            Capability::GetItem => self.get_item.is_some(),
            Capability::SetItem => self.set_item.is_some(),
            Capability::DeleteItem => self.delete_item.is_some(),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        let f = self
            .clear
            .as_ref()
            .ok_or(StoreError::Unsupported(Capability::Clear))?;
        f()
    }

    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let f = self
            .get_item
            .as_ref()
            .ok_or(StoreError::Unsupported(Capability::GetItem))?;
        f(key)
    }

    fn set_item(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let f = self
            .set_item
            .as_ref()
            .ok_or(StoreError::Unsupported(Capability::SetItem))?;
        f(key, bytes)
    }

    fn delete_item(&self, key: &str) -> Result<(), StoreError> {
        let f = self
            .delete_item
            .as_ref()
            .ok_or(StoreError::Unsupported(Capability::DeleteItem))?;
        f(key)
    }
}
