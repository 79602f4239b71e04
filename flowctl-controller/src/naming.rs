//! Canonical resource keys.
//!
//! Every tracked entity maps to `resources/<uid>/types/<type>`, and an
//! in-flight operation for it to `<key>/workflow`.

use std::fmt;
use std::str::FromStr;

use crate::resource::ResourceError;

const KEY_PREFIX: &str = "resources/";
const TYPE_SEPARATOR: &str = "/types/";
const WORKFLOW_SUFFIX: &str = "/workflow";

/// Kind of a tracked resource. Selects the state variant and the owning reconciler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Model,
    SourceConnector,
    DestinationConnector,
    Pipeline,
    Service,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Model,
        ResourceKind::SourceConnector,
        ResourceKind::DestinationConnector,
        ResourceKind::Pipeline,
        ResourceKind::Service,
    ];

    /// The `<type>` segment of a resource key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Model => "model",
            ResourceKind::SourceConnector => "source-connector",
            ResourceKind::DestinationConnector => "destination-connector",
            ResourceKind::Pipeline => "pipeline",
            ResourceKind::Service => "service",
        }
    }

    /// Collection prefix the owning backend uses in entity names, if any.
    fn collection(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Model => Some("models/"),
            ResourceKind::SourceConnector => Some("source-connectors/"),
            ResourceKind::DestinationConnector => Some("destination-connectors/"),
            ResourceKind::Pipeline => Some("pipelines/"),
            ResourceKind::Service => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ResourceError::UnknownResourceType(s.to_string()))
    }
}

/// Parsed form of `resources/<uid>/types/<type>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    uid: String,
    kind: ResourceKind,
}

impl ResourceName {
    pub fn new(uid: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            uid: uid.into(),
            kind,
        }
    }

    /// Map a backend entity identifier (`models/<id>`, `source-connectors/<id>`,
    /// a service hostname, ...) to its resource name.
    ///
    /// The collection prefix is stripped when present; anything else is used
    /// verbatim as the uid, so the mapping is total and stable.
    pub fn from_entity(raw: &str, kind: ResourceKind) -> Self {
        let uid = kind
            .collection()
            .and_then(|prefix| raw.strip_prefix(prefix))
            .unwrap_or(raw);
        Self::new(uid, kind)
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Store key holding the state value.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Store key holding the in-flight workflow id.
    pub fn workflow_key(&self) -> String {
        format!("{}{}", self.key(), WORKFLOW_SUFFIX)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}{}", KEY_PREFIX, self.uid, TYPE_SEPARATOR, self.kind)
    }
}

impl FromStr for ResourceName {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ResourceError::MalformedName(s.to_string());
        let rest = s.strip_prefix(KEY_PREFIX).ok_or_else(malformed)?;
        let (uid, kind) = rest.rsplit_once(TYPE_SEPARATOR).ok_or_else(malformed)?;
        if uid.is_empty() {
            return Err(malformed());
        }
        Ok(Self::new(uid, kind.parse()?))
    }
}
