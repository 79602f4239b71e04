//! In-memory store for dev mode and tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KvStore, Result, StoreError};

/// [`KvStore`] held in process memory. Nothing survives a restart.
#[derive(Debug)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    available: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate an outage: while unavailable every request fails with
    /// [`StoreError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of all keys and values.
    pub async fn dump(&self) -> BTreeMap<String, String> {
        self.entries.read().await.clone()
    }

    fn check(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store marked unavailable".to_string()))
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str, _timeout: Duration) -> Result<Option<String>> {
        self.check()?;
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str, _timeout: Duration) -> Result<()> {
        self.check()?;
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str, _timeout: Duration) -> Result<()> {
        self.check()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn status(&self, _timeout: Duration) -> Result<()> {
        self.check()
    }
}
