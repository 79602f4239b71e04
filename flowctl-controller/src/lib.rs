//! flowctl-controller: keeps one authoritative state per pipeline-platform
//! resource (backend services, models, connectors, pipelines) in etcd.
//!
//! Reconcilers probe the backends on a fixed cadence and commit normalized
//! states; the gRPC API exposes them to the rest of the platform.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod grpc;
pub mod naming;
pub mod proto;
pub mod reconciler;
pub mod repository;
pub mod resource;
pub mod store;

pub use config::ControllerConfig;
pub use controller::{ControlLoop, Schedule};
pub use error::{Error, Result};
pub use grpc::{ControllerPrivateServiceServer, ControllerServiceImpl};
pub use naming::{ResourceKind, ResourceName};
pub use repository::ResourceRepository;
pub use resource::{Resource, ResourceState};
