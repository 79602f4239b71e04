//! Mapping between wire and domain resources.

use tonic::Status;

use crate::error::Error;
use crate::naming::{ResourceKind, ResourceName};
use crate::proto::controller::{resource, Resource as ProtoResource};
use crate::resource::{Resource, ResourceError, ResourceState};
use crate::store::StoreError;

const WATCH_SUFFIX: &str = "/watch";

/// Parse a resource name from a request. A trailing `/watch` is accepted.
pub(crate) fn parse_name(raw: &str) -> Result<ResourceName, Status> {
    let raw = raw.strip_suffix(WATCH_SUFFIX).unwrap_or(raw);
    raw.parse::<ResourceName>()
        .map_err(|e| Status::invalid_argument(e.to_string()))
}

pub(crate) fn to_proto(resource: &Resource) -> ProtoResource {
    let value = resource.state().value();
    let state = match resource.state() {
        ResourceState::Model(_) => resource::State::ModelState(value),
        ResourceState::SourceConnector(_) | ResourceState::DestinationConnector(_) => {
            resource::State::ConnectorState(value)
        }
        ResourceState::Pipeline(_) => resource::State::PipelineState(value),
        ResourceState::Service(_) => resource::State::BackendState(value),
    };
    ProtoResource {
        name: resource.name().key(),
        state: Some(state),
        progress: resource.progress(),
    }
}

/// Validate a resource sent by a client. The state field must be the one
/// belonging to the name's kind; both connector kinds use `connector_state`.
pub(crate) fn from_proto(proto: ProtoResource) -> Result<Resource, Status> {
    let name = parse_name(&proto.name)?;
    let kind = name.kind();
    let value = match (kind, proto.state) {
        (ResourceKind::Model, Some(resource::State::ModelState(v)))
        | (ResourceKind::SourceConnector, Some(resource::State::ConnectorState(v)))
        | (ResourceKind::DestinationConnector, Some(resource::State::ConnectorState(v)))
        | (ResourceKind::Pipeline, Some(resource::State::PipelineState(v)))
        | (ResourceKind::Service, Some(resource::State::BackendState(v))) => v,
        (_, None) => {
            return Err(Status::invalid_argument(format!(
                "{} has no state",
                proto.name
            )))
        }
        (_, Some(_)) => {
            return Err(Status::invalid_argument(format!(
                "state field does not match resource type {}",
                kind
            )))
        }
    };
    let state = ResourceState::from_value(kind, value)
        .map_err(|e| Status::invalid_argument(e.to_string()))?;
    let resource =
        Resource::new(name, state).map_err(|e| Status::invalid_argument(e.to_string()))?;
    Ok(resource.with_progress(proto.progress))
}

impl From<Error> for Status {
    fn from(e: Error) -> Self {
        match e {
            Error::Resource(ResourceError::MalformedState { .. }) => Status::internal(e.to_string()),
            Error::Resource(_) => Status::invalid_argument(e.to_string()),
            Error::Store(StoreError::Unavailable(_) | StoreError::Timeout { .. }) => {
                Status::unavailable(e.to_string())
            }
            Error::Store(StoreError::Corrupt { .. }) => Status::internal(e.to_string()),
            Error::Backend(_) => Status::internal(e.to_string()),
        }
    }
}
