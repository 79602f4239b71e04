//! Resource state and workflow references on top of a [`KvStore`].

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::naming::ResourceName;
use crate::resource::{Resource, ResourceState};
use crate::store::{KvStore, StoreError};

/// Reads and writes the two key families kept per resource:
/// `<key>` → state value and `<key>/workflow` → in-flight operation id.
///
/// Every request is bounded by the configured store timeout.
pub struct ResourceRepository {
    kv: Arc<dyn KvStore>,
    timeout: Duration,
}

impl ResourceRepository {
    pub fn new(kv: Arc<dyn KvStore>, timeout: Duration) -> Self {
        Self { kv, timeout }
    }

    /// Latest committed state, `None` if the resource was never recorded.
    pub async fn get(&self, name: &ResourceName) -> Result<Option<Resource>> {
        match self.kv.get(&name.key(), self.timeout).await? {
            Some(raw) => Ok(Some(Resource::decode(name.clone(), &raw)?)),
            None => Ok(None),
        }
    }

    /// Commit a state.
    pub async fn put(&self, resource: &Resource) -> Result<()> {
        self.kv
            .put(&resource.name().key(), &resource.encode(), self.timeout)
            .await?;
        debug!(resource = %resource.name(), state = ?resource.state(), "Committed state");
        Ok(())
    }

    /// Commit `state` under `name`. Fails if the state belongs to another kind.
    pub async fn commit(&self, name: &ResourceName, state: ResourceState) -> Result<()> {
        self.put(&Resource::new(name.clone(), state)?).await
    }

    /// Commit a caller-asserted state, recording `workflow_id` first when given.
    ///
    /// A concurrent reader therefore never sees the new state without the
    /// workflow reference that qualifies it.
    pub async fn update(&self, resource: &Resource, workflow_id: Option<&str>) -> Result<()> {
        if let Some(id) = workflow_id {
            self.put_workflow(resource.name(), id).await?;
        }
        self.put(resource).await
    }

    /// Remove the state and any workflow reference. Absent keys are fine.
    pub async fn delete(&self, name: &ResourceName) -> Result<()> {
        self.kv.delete(&name.key(), self.timeout).await?;
        self.delete_workflow(name).await
    }

    /// In-flight workflow id, if any.
    pub async fn workflow(&self, name: &ResourceName) -> Result<Option<String>> {
        let id = self.kv.get(&name.workflow_key(), self.timeout).await?;
        Ok(id.filter(|id| !id.is_empty()))
    }

    pub async fn put_workflow(&self, name: &ResourceName, workflow_id: &str) -> Result<()> {
        self.kv
            .put(&name.workflow_key(), workflow_id, self.timeout)
            .await?;
        debug!(resource = %name, workflow_id = %workflow_id, "Recorded workflow");
        Ok(())
    }

    pub async fn delete_workflow(&self, name: &ResourceName) -> Result<()> {
        self.kv.delete(&name.workflow_key(), self.timeout).await?;
        Ok(())
    }

    /// Whether the backing store answers.
    pub async fn health(&self) -> std::result::Result<(), StoreError> {
        self.kv.status(self.timeout).await
    }
}
