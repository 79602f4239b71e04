//! Resource state model and its stored encoding.
//!
//! A resource's state is one of five variants, one per [`ResourceKind`].
//! In the store it is the variant's integer enum value, stringified.

use thiserror::Error;

use crate::naming::{ResourceKind, ResourceName};
pub use crate::proto::connector::ConnectorState;
pub use crate::proto::healthcheck::ServingStatus;
pub use crate::proto::model::ModelState;
pub use crate::proto::pipeline::PipelineState;

/// Errors raised while naming, encoding or decoding resources.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    /// The `<type>` segment is not one of the recognized kinds.
    #[error("unknown resource type: {0}")]
    UnknownResourceType(String),

    /// The name is not of the form `resources/<uid>/types/<type>`.
    #[error("malformed resource name: {0}")]
    MalformedName(String),

    /// The stored value is not a valid state for the kind.
    #[error("malformed {kind} state: {value:?}")]
    MalformedState { kind: ResourceKind, value: String },

    /// The state variant does not belong to the name's kind.
    #[error("{name} cannot hold a {state} state")]
    KindMismatch { name: String, state: ResourceKind },
}

/// Coarse health of a dependency, used for pipeline aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    /// Offline / disconnected / not serving / inactive.
    Down,
    /// Nothing settled yet.
    Unknown,
    Failed,
}

/// Per-kind state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Service(ServingStatus),
    Model(ModelState),
    SourceConnector(ConnectorState),
    DestinationConnector(ConnectorState),
    Pipeline(PipelineState),
}

impl ResourceState {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceState::Service(_) => ResourceKind::Service,
            ResourceState::Model(_) => ResourceKind::Model,
            ResourceState::SourceConnector(_) => ResourceKind::SourceConnector,
            ResourceState::DestinationConnector(_) => ResourceKind::DestinationConnector,
            ResourceState::Pipeline(_) => ResourceKind::Pipeline,
        }
    }

    /// The provisional state written while an operation is in flight.
    pub fn unspecified(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Service => ResourceState::Service(ServingStatus::Unspecified),
            ResourceKind::Model => ResourceState::Model(ModelState::Unspecified),
            ResourceKind::SourceConnector => {
                ResourceState::SourceConnector(ConnectorState::Unspecified)
            }
            ResourceKind::DestinationConnector => {
                ResourceState::DestinationConnector(ConnectorState::Unspecified)
            }
            ResourceKind::Pipeline => ResourceState::Pipeline(PipelineState::Unspecified),
        }
    }

    /// The failure state of a kind. Services have none and report NOT_SERVING.
    pub fn error(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Service => ResourceState::Service(ServingStatus::NotServing),
            ResourceKind::Model => ResourceState::Model(ModelState::Error),
            ResourceKind::SourceConnector => ResourceState::SourceConnector(ConnectorState::Error),
            ResourceKind::DestinationConnector => {
                ResourceState::DestinationConnector(ConnectorState::Error)
            }
            ResourceKind::Pipeline => ResourceState::Pipeline(PipelineState::Error),
        }
    }

    /// Wrap a raw enum value in the variant selected by `kind`.
    pub fn from_value(kind: ResourceKind, value: i32) -> Result<Self, ResourceError> {
        let malformed = || ResourceError::MalformedState {
            kind,
            value: value.to_string(),
        };
        let state = match kind {
            ResourceKind::Service => {
                ResourceState::Service(ServingStatus::try_from(value).map_err(|_| malformed())?)
            }
            ResourceKind::Model => {
                ResourceState::Model(ModelState::try_from(value).map_err(|_| malformed())?)
            }
            ResourceKind::SourceConnector => ResourceState::SourceConnector(
                ConnectorState::try_from(value).map_err(|_| malformed())?,
            ),
            ResourceKind::DestinationConnector => ResourceState::DestinationConnector(
                ConnectorState::try_from(value).map_err(|_| malformed())?,
            ),
            ResourceKind::Pipeline => {
                ResourceState::Pipeline(PipelineState::try_from(value).map_err(|_| malformed())?)
            }
        };
        Ok(state)
    }

    /// The underlying integer enum value.
    pub fn value(&self) -> i32 {
        match *self {
            ResourceState::Service(s) => s as i32,
            ResourceState::Model(s) => s as i32,
            ResourceState::SourceConnector(s) | ResourceState::DestinationConnector(s) => s as i32,
            ResourceState::Pipeline(s) => s as i32,
        }
    }

    pub fn health(&self) -> Health {
        match *self {
            ResourceState::Service(s) => match s {
                ServingStatus::Serving => Health::Healthy,
                ServingStatus::NotServing => Health::Down,
                ServingStatus::Unspecified => Health::Unknown,
            },
            ResourceState::Model(s) => match s {
                ModelState::Online => Health::Healthy,
                ModelState::Offline => Health::Down,
                ModelState::Unspecified => Health::Unknown,
                ModelState::Error => Health::Failed,
            },
            ResourceState::SourceConnector(s) | ResourceState::DestinationConnector(s) => match s {
                ConnectorState::Connected => Health::Healthy,
                ConnectorState::Disconnected => Health::Down,
                ConnectorState::Unspecified => Health::Unknown,
                ConnectorState::Error => Health::Failed,
            },
            ResourceState::Pipeline(s) => match s {
                PipelineState::Active => Health::Healthy,
                PipelineState::Inactive => Health::Down,
                PipelineState::Unspecified => Health::Unknown,
                PipelineState::Error => Health::Failed,
            },
        }
    }
}

/// A named, typed entity and its latest known state.
///
/// The state variant always matches the kind in the name; [`Resource::new`]
/// is the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    name: ResourceName,
    state: ResourceState,
    progress: Option<i32>,
}

impl Resource {
    pub fn new(name: ResourceName, state: ResourceState) -> Result<Self, ResourceError> {
        if name.kind() != state.kind() {
            return Err(ResourceError::KindMismatch {
                name: name.key(),
                state: state.kind(),
            });
        }
        Ok(Self {
            name,
            state,
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: Option<i32>) -> Self {
        self.progress = progress;
        self
    }

    pub fn name(&self) -> &ResourceName {
        &self.name
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    pub fn progress(&self) -> Option<i32> {
        self.progress
    }

    /// Stored form of the state.
    pub fn encode(&self) -> String {
        self.state.value().to_string()
    }

    /// Rebuild a resource from its name and stored value.
    pub fn decode(name: ResourceName, raw: &str) -> Result<Self, ResourceError> {
        let value: i32 = raw
            .trim()
            .parse()
            .map_err(|_| ResourceError::MalformedState {
                kind: name.kind(),
                value: raw.to_string(),
            })?;
        let state = ResourceState::from_value(name.kind(), value)?;
        Resource::new(name, state)
    }
}

/// [`Resource::decode`] for a name still in key form.
pub fn decode(name: &str, raw: &str) -> Result<Resource, ResourceError> {
    Resource::decode(name.parse()?, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_states() -> Vec<ResourceState> {
        let mut states = vec![];
        for s in [
            ServingStatus::Unspecified,
            ServingStatus::Serving,
            ServingStatus::NotServing,
        ] {
            states.push(ResourceState::Service(s));
        }
        for s in [
            ModelState::Unspecified,
            ModelState::Offline,
            ModelState::Online,
            ModelState::Error,
        ] {
            states.push(ResourceState::Model(s));
        }
        for s in [
            ConnectorState::Unspecified,
            ConnectorState::Disconnected,
            ConnectorState::Connected,
            ConnectorState::Error,
        ] {
            states.push(ResourceState::SourceConnector(s));
            states.push(ResourceState::DestinationConnector(s));
        }
        for s in [
            PipelineState::Unspecified,
            PipelineState::Inactive,
            PipelineState::Active,
            PipelineState::Error,
        ] {
            states.push(ResourceState::Pipeline(s));
        }
        states
    }

    #[test]
    fn test_decode_inverts_encode_for_every_state() {
        for state in all_states() {
            let resource = Resource::new(ResourceName::new("uid-1", state.kind()), state).unwrap();
            let decoded = decode(&resource.name().key(), &resource.encode()).unwrap();
            assert_eq!(decoded, resource);
        }
    }

    #[test]
    fn test_encode_is_integer_value() {
        let resource = Resource::new(
            ResourceName::new("m", ResourceKind::Model),
            ResourceState::Model(ModelState::Online),
        )
        .unwrap();
        assert_eq!(resource.encode(), "2");

        let resource = Resource::new(
            ResourceName::new("svc", ResourceKind::Service),
            ResourceState::Service(ServingStatus::NotServing),
        )
        .unwrap();
        assert_eq!(resource.encode(), "2");
    }

    #[test]
    fn test_new_rejects_kind_mismatch() {
        let err = Resource::new(
            ResourceName::new("p", ResourceKind::Pipeline),
            ResourceState::Model(ModelState::Online),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::KindMismatch {
                state: ResourceKind::Model,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_rejects_non_integer() {
        let err = decode("resources/c/types/source-connector", "CONNECTED").unwrap_err();
        assert!(matches!(
            err,
            ResourceError::MalformedState {
                kind: ResourceKind::SourceConnector,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range_value() {
        let err = decode("resources/svc/types/service", "7").unwrap_err();
        assert!(matches!(err, ResourceError::MalformedState { .. }));
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        let err = decode("resources/x/types/models", "1").unwrap_err();
        assert_eq!(err, ResourceError::UnknownResourceType("models".to_string()));
    }

    #[test]
    fn test_health_classification() {
        assert_eq!(ResourceState::Model(ModelState::Online).health(), Health::Healthy);
        assert_eq!(ResourceState::Model(ModelState::Offline).health(), Health::Down);
        assert_eq!(
            ResourceState::SourceConnector(ConnectorState::Unspecified).health(),
            Health::Unknown
        );
        assert_eq!(
            ResourceState::DestinationConnector(ConnectorState::Error).health(),
            Health::Failed
        );
    }

    #[test]
    fn test_unspecified_and_error_match_kind() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceState::unspecified(kind).kind(), kind);
            assert_eq!(ResourceState::unspecified(kind).value(), 0);
            assert_eq!(ResourceState::error(kind).kind(), kind);
        }
    }
}
