//! Store port
//!
//! Keyed persistence for sessions and proofs. [`InMemoryStore`] is the
//! default implementation; nothing outlives the process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Keyed storage for values of type `T`
#[async_trait]
pub trait Store<T>: Send + Sync
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<Option<T>, StoreError>;

    async fn put(&self, id: &str, value: T) -> Result<(), StoreError>;

    /// Remove and return the value, if present
    async fn delete(&self, id: &str) -> Result<Option<T>, StoreError>;
}

/// Concurrency-safe in-process store
pub struct InMemoryStore<T> {
    items: RwLock<HashMap<String, T>>,
}

impl<T> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

impl<T> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T> Store<T> for InMemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.items.read().await.get(id).cloned())
    }

    async fn put(&self, id: &str, value: T) -> Result<(), StoreError> {
        self.items.write().await.insert(id.to_string(), value);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<Option<T>, StoreError> {
        Ok(self.items.write().await.remove(id))
    }
}

/// One async mutex per key.
///
/// Serializes read-modify-write sequences on the same id while different
/// ids proceed independently.
#[derive(Default)]
pub struct KeyedLocks {
    locks: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries nobody holds or waits on are dropped
            locks.retain(|k, m| k == key || Arc::strong_count(m) > 1);
            Arc::clone(locks.entry(key.to_string()).or_default())
        };
        mutex.lock_owned().await
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
