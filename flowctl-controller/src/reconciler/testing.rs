//! In-process backend fakes for reconciler tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::backend::{
    BackendError, CheckOutcome, EntityProbe, LivenessProbe, OperationPoller, OperationStatus,
    Page, PipelineEntry, PipelineLister, PipelineRecipe,
};
use crate::naming::ResourceKind;
use crate::repository::ResourceRepository;
use crate::resource::{PipelineState, ServingStatus};
use crate::store::MemoryStore;

pub fn repository() -> (Arc<MemoryStore>, Arc<ResourceRepository>) {
    let kv = Arc::new(MemoryStore::new());
    let repo = Arc::new(ResourceRepository::new(kv.clone(), Duration::from_secs(1)));
    (kv, repo)
}

fn unavailable() -> BackendError {
    BackendError::Rpc(tonic::Status::unavailable("backend down"))
}

/// Serves a fixed entity list two at a time; entities without a configured
/// outcome fail their check.
pub struct FakeProbe {
    kind: ResourceKind,
    entities: Vec<String>,
    outcomes: Mutex<HashMap<String, CheckOutcome>>,
    pub checked: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn new(kind: ResourceKind, entities: &[&str]) -> Self {
        Self {
            kind,
            entities: entities.iter().map(|e| e.to_string()).collect(),
            outcomes: Mutex::new(HashMap::new()),
            checked: Mutex::new(vec![]),
        }
    }

    pub fn state(self, entity: &str, state: i32) -> Self {
        self.outcome(entity, state, None)
    }

    pub fn outcome(self, entity: &str, state: i32, workflow_id: Option<&str>) -> Self {
        self.outcomes.lock().unwrap().insert(
            entity.to_string(),
            CheckOutcome {
                state,
                workflow_id: workflow_id.map(str::to_string),
            },
        );
        self
    }
}

#[async_trait]
impl EntityProbe for FakeProbe {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn list(&self, page_token: Option<String>) -> Result<Page<String>, BackendError> {
        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + 2).min(self.entities.len());
        Ok(Page {
            items: self.entities[start..end].to_vec(),
            next_page_token: if end < self.entities.len() {
                end.to_string()
            } else {
                String::new()
            },
            total_size: self.entities.len() as i64,
        })
    }

    async fn check(&self, name: &str) -> Result<CheckOutcome, BackendError> {
        self.checked.lock().unwrap().push(name.to_string());
        self.outcomes
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(unavailable)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FakeOperation {
    Running,
    Done(Option<i32>),
    Expired,
}

/// Operations keyed by workflow id; unknown ids fail with an RPC error.
#[derive(Default)]
pub struct FakePoller {
    operations: Mutex<HashMap<String, FakeOperation>>,
}

impl FakePoller {
    pub fn with(self, workflow_id: &str, op: FakeOperation) -> Self {
        self.operations
            .lock()
            .unwrap()
            .insert(workflow_id.to_string(), op);
        self
    }
}

#[async_trait]
impl OperationPoller for FakePoller {
    async fn poll(
        &self,
        workflow_id: &str,
        _kind: ResourceKind,
    ) -> Result<OperationStatus, BackendError> {
        let op = self.operations.lock().unwrap().get(workflow_id).copied();
        match op {
            Some(FakeOperation::Running) => Ok(OperationStatus {
                done: false,
                result: None,
            }),
            Some(FakeOperation::Done(result)) => Ok(OperationStatus { done: true, result }),
            Some(FakeOperation::Expired) => {
                Err(BackendError::OperationNotFound(workflow_id.to_string()))
            }
            None => Err(unavailable()),
        }
    }
}

#[derive(Default)]
pub struct FakePipelines {
    pub entries: Vec<PipelineEntry>,
}

impl FakePipelines {
    pub fn with(mut self, id: &str, configured: PipelineState, deps: (&str, &str, &[&str])) -> Self {
        self.entries.push(PipelineEntry {
            name: format!("pipelines/{}", id),
            configured,
            recipe: Some(PipelineRecipe {
                source: format!("source-connectors/{}", deps.0),
                destination: format!("destination-connectors/{}", deps.1),
                models: deps.2.iter().map(|m| format!("models/{}", m)).collect(),
            }),
        });
        self
    }

    pub fn without_recipe(mut self, id: &str, configured: PipelineState) -> Self {
        self.entries.push(PipelineEntry {
            name: format!("pipelines/{}", id),
            configured,
            recipe: None,
        });
        self
    }
}

#[async_trait]
impl PipelineLister for FakePipelines {
    async fn list(
        &self,
        _page_token: Option<String>,
    ) -> Result<Page<PipelineEntry>, BackendError> {
        Ok(Page {
            items: self.entries.clone(),
            next_page_token: String::new(),
            total_size: self.entries.len() as i64,
        })
    }
}

/// Liveness probe answering with a fixed status, or failing when `None`.
pub struct FakeLiveness {
    pub host: String,
    pub status: Option<ServingStatus>,
}

impl FakeLiveness {
    pub fn new(host: &str, status: Option<ServingStatus>) -> Self {
        Self {
            host: host.to_string(),
            status,
        }
    }
}

#[async_trait]
impl LivenessProbe for FakeLiveness {
    fn service(&self) -> &str {
        &self.host
    }

    async fn liveness(&self) -> Result<ServingStatus, BackendError> {
        self.status.ok_or_else(unavailable)
    }
}
