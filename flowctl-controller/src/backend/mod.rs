//! Clients for the platform backends the controller probes.
//!
//! The reconcilers only see the traits defined here:
//! - [`EntityProbe`]: paginated listing + synchronous check (models, connectors)
//! - [`OperationPoller`]: completion status of an in-flight workflow
//! - [`PipelineLister`]: paginated pipeline listing with recipes
//! - [`LivenessProbe`]: serving status of a backend service
//!
//! The gRPC implementations live in the submodules.

pub mod connector;
pub mod health;
pub mod model;
pub mod operation;
pub mod pipeline;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tonic::transport::{Channel, Uri};

use crate::naming::{ResourceKind, ResourceName};
use crate::proto::healthcheck::LivenessResponse;
use crate::resource::{PipelineState, ServingStatus};

pub use connector::{ConnectorClient, ConnectorProbe};
pub use health::{InferenceClient, MgmtClient};
pub use model::ModelClient;
pub use operation::GrpcOperationPoller;
pub use pipeline::PipelineClient;

/// Errors returned by backend calls.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("rpc failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// The backend has no record of the workflow (e.g. expired).
    #[error("operation {0} not found")]
    OperationNotFound(String),

    #[error("{0} resources have no operations")]
    UnsupportedKind(ResourceKind),

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: String,
    pub total_size: i64,
}

/// Result of a synchronous check RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Raw state enum value reported by the backend.
    pub state: i32,
    /// Set when the backend started an asynchronous re-check instead.
    pub workflow_id: Option<String>,
}

/// Completion status of a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationStatus {
    pub done: bool,
    /// Terminal state value to commit once done.
    pub result: Option<i32>,
}

/// A pipeline and the resources it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineEntry {
    /// `pipelines/<id>`
    pub name: String,
    /// Desired state configured by the owner.
    pub configured: PipelineState,
    /// `None` when the backend returned the pipeline without its recipe.
    pub recipe: Option<PipelineRecipe>,
}

/// The components a pipeline is assembled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRecipe {
    /// `source-connectors/<id>`
    pub source: String,
    /// `destination-connectors/<id>`
    pub destination: String,
    /// `models/<id>`, in declaration order.
    pub models: Vec<String>,
}

impl PipelineEntry {
    /// Dependencies in declaration order: source, destination, then models.
    /// `None` when the recipe is unknown.
    pub fn dependencies(&self) -> Option<Vec<ResourceName>> {
        let recipe = self.recipe.as_ref()?;
        let mut deps = Vec::with_capacity(recipe.models.len() + 2);
        deps.push(ResourceName::from_entity(
            &recipe.source,
            ResourceKind::SourceConnector,
        ));
        deps.push(ResourceName::from_entity(
            &recipe.destination,
            ResourceKind::DestinationConnector,
        ));
        deps.extend(
            recipe
                .models
                .iter()
                .map(|m| ResourceName::from_entity(m, ResourceKind::Model)),
        );
        Some(deps)
    }
}

/// Lists and checks the entities of one resource kind.
#[async_trait]
pub trait EntityProbe: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Fetch one page of entity names (`models/<id>`, ...).
    async fn list(&self, page_token: Option<String>) -> Result<Page<String>, BackendError>;

    /// Check one entity's current state.
    async fn check(&self, name: &str) -> Result<CheckOutcome, BackendError>;
}

/// Queries the completion status of a workflow for a resource kind.
#[async_trait]
pub trait OperationPoller: Send + Sync {
    async fn poll(
        &self,
        workflow_id: &str,
        kind: ResourceKind,
    ) -> Result<OperationStatus, BackendError>;
}

#[async_trait]
pub trait PipelineLister: Send + Sync {
    async fn list(&self, page_token: Option<String>)
        -> Result<Page<PipelineEntry>, BackendError>;
}

/// Liveness of one backend service.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Service hostname, used as the resource uid.
    fn service(&self) -> &str;

    async fn liveness(&self) -> Result<ServingStatus, BackendError>;
}

/// Build a lazily connecting channel. Every request on it is bounded by `timeout`.
pub fn channel(endpoint: &str, timeout: Duration) -> Result<Channel, BackendError> {
    let channel = Channel::from_shared(endpoint.to_string())
        .map_err(|e| BackendError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?
        .connect_timeout(timeout)
        .timeout(timeout)
        .connect_lazy();
    Ok(channel)
}

/// Host component of an endpoint URI (`http://model-backend:8083` → `model-backend`).
pub fn endpoint_host(endpoint: &str) -> Result<String, BackendError> {
    let invalid = |reason: String| BackendError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        reason,
    };
    let uri = endpoint
        .parse::<Uri>()
        .map_err(|e| invalid(format!("{e}")))?;
    uri.host()
        .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| invalid("missing host".to_string()))
}

/// Serving status carried by a liveness response. A missing payload is UNSPECIFIED.
pub(crate) fn serving_status(resp: LivenessResponse) -> ServingStatus {
    resp.health_check_response
        .map(|h| h.status())
        .unwrap_or(ServingStatus::Unspecified)
}

/// Workflow ids arrive as optional strings; empty means none.
pub(crate) fn workflow_id(raw: Option<String>) -> Option<String> {
    raw.filter(|id| !id.is_empty())
}
