//! Generated protobuf types for flowctl-controller.
//!
//! The `flowctl.*` packages are siblings here so cross-package references
//! in the generated code (`super::model::ModelState`, ...) resolve.

#![allow(clippy::enum_variant_names)]

/// Shared health check payloads
pub mod healthcheck {
    tonic::include_proto!("flowctl.healthcheck");
}

/// Long-running operation payloads
pub mod operation {
    tonic::include_proto!("flowctl.operation");
}

/// Controller private API (served)
pub mod controller {
    tonic::include_proto!("flowctl.controller");
}

/// Model backend
pub mod model {
    tonic::include_proto!("flowctl.model");
}

/// Connector backend
pub mod connector {
    tonic::include_proto!("flowctl.connector");
}

/// Pipeline backend
pub mod pipeline {
    tonic::include_proto!("flowctl.pipeline");
}

/// Management backend
pub mod mgmt {
    tonic::include_proto!("flowctl.mgmt");
}

/// Inference server
pub mod inference {
    tonic::include_proto!("inference");
}
