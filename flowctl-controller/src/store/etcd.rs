//! etcd-backed store.

use std::time::Duration;

use async_trait::async_trait;
use etcd_client::{Client, ConnectOptions};
use tracing::{debug, info};

use super::{bounded, KvStore, Result, StoreError};

fn unavailable(e: etcd_client::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

/// Values are written as UTF-8 strings; anything else was not written by us.
fn decode_value(key: &str, raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// [`KvStore`] over an etcd v3 cluster.
///
/// The client multiplexes over one balanced channel, so each request works
/// on its own cheap clone.
#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    /// Create a client for `endpoints`, dialing each for at most `dial_timeout`.
    pub async fn connect(endpoints: &[String], dial_timeout: Duration) -> Result<Self> {
        info!(endpoints = ?endpoints, "Connecting to etcd");
        let options = ConnectOptions::new().with_connect_timeout(dial_timeout);
        let client = Client::connect(endpoints, Some(options))
            .await
            .map_err(unavailable)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl KvStore for EtcdStore {
    async fn get(&self, key: &str, timeout: Duration) -> Result<Option<String>> {
        let mut kv = self.client.kv_client();
        bounded(key, timeout, async move {
            let resp = kv.get(key, None).await.map_err(unavailable)?;
            resp.kvs()
                .first()
                .map(|entry| decode_value(key, entry.value()))
                .transpose()
        })
        .await
    }

    async fn put(&self, key: &str, value: &str, timeout: Duration) -> Result<()> {
        let mut kv = self.client.kv_client();
        bounded(key, timeout, async move {
            kv.put(key, value, None).await.map_err(unavailable)?;
            debug!(key = %key, value = %value, "etcd put");
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str, timeout: Duration) -> Result<()> {
        let mut kv = self.client.kv_client();
        bounded(key, timeout, async move {
            let resp = kv.delete(key, None).await.map_err(unavailable)?;
            debug!(key = %key, deleted = resp.deleted(), "etcd delete");
            Ok(())
        })
        .await
    }

    async fn status(&self, timeout: Duration) -> Result<()> {
        let mut maintenance = self.client.maintenance_client();
        bounded("<status>", timeout, async move {
            maintenance.status().await.map_err(unavailable)?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_value() {
        assert_eq!(decode_value("k", b"2").unwrap(), "2");
    }

    #[test]
    fn test_non_utf8_value_is_corrupt() {
        let err = decode_value("resources/m/types/model", &[0xff, 0xfe]).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Corrupt { ref key, .. } if key == "resources/m/types/model"
        ));
    }
}
