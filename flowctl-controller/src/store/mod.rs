//! Key-value store access.
//!
//! [`KvStore`] is the thin contract the controller needs from etcd: single-key
//! get/put/delete, each bounded by a caller-supplied timeout, plus a health
//! probe. Writes are unconditional upserts (last writer wins).

mod error;
pub mod etcd;
pub mod memory;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

pub use error::{Result, StoreError};
pub use etcd::EtcdStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Fetch a key. An absent key is `Ok(None)`, not an error.
    async fn get(&self, key: &str, timeout: Duration) -> Result<Option<String>>;

    /// Unconditional upsert.
    async fn put(&self, key: &str, value: &str, timeout: Duration) -> Result<()>;

    /// Delete a key. Deleting an absent key succeeds.
    async fn delete(&self, key: &str, timeout: Duration) -> Result<()>;

    /// Check that the store is reachable.
    async fn status(&self, timeout: Duration) -> Result<()>;
}

/// Run a store request, mapping an elapsed deadline to [`StoreError::Timeout`].
pub(crate) async fn bounded<T, F>(key: &str, timeout: Duration, request: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, request)
        .await
        .map_err(|_| StoreError::Timeout {
            key: key.to_string(),
            timeout,
        })?
}
