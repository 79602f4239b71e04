//! gRPC API served by the controller.

mod convert;
pub mod server;

pub use crate::proto::controller::controller_private_service_server::ControllerPrivateServiceServer;
pub use server::ControllerServiceImpl;
