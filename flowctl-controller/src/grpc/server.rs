//! ControllerPrivateService implementation.

use std::sync::Arc;

use tonic::{Request, Response, Status};
use tracing::{debug, info};

use super::convert::{from_proto, parse_name, to_proto};
use crate::proto::controller::controller_private_service_server::ControllerPrivateService;
use crate::proto::controller::{
    DeleteResourceRequest, DeleteResourceResponse, GetResourceRequest, GetResourceResponse,
    UpdateResourceRequest, UpdateResourceResponse,
};
use crate::proto::healthcheck::{
    HealthCheckResponse, LivenessRequest, LivenessResponse, ReadinessRequest, ReadinessResponse,
    ServingStatus,
};
use crate::repository::ResourceRepository;

/// Read/write/delete access to resource state for the rest of the platform.
pub struct ControllerServiceImpl {
    repo: Arc<ResourceRepository>,
}

impl ControllerServiceImpl {
    pub fn new(repo: Arc<ResourceRepository>) -> Self {
        Self { repo }
    }
}

fn serving() -> Option<HealthCheckResponse> {
    Some(HealthCheckResponse {
        status: ServingStatus::Serving as i32,
    })
}

#[tonic::async_trait]
impl ControllerPrivateService for ControllerServiceImpl {
    async fn liveness(
        &self,
        _request: Request<LivenessRequest>,
    ) -> Result<Response<LivenessResponse>, Status> {
        Ok(Response::new(LivenessResponse {
            health_check_response: serving(),
        }))
    }

    async fn readiness(
        &self,
        _request: Request<ReadinessRequest>,
    ) -> Result<Response<ReadinessResponse>, Status> {
        Ok(Response::new(ReadinessResponse {
            health_check_response: serving(),
        }))
    }

    async fn get_resource(
        &self,
        request: Request<GetResourceRequest>,
    ) -> Result<Response<GetResourceResponse>, Status> {
        let req = request.into_inner();
        let name = parse_name(&req.name)?;

        let resource = self
            .repo
            .get(&name)
            .await?
            .ok_or_else(|| Status::not_found(format!("Resource '{}' not found", name)))?;

        Ok(Response::new(GetResourceResponse {
            resource: Some(to_proto(&resource)),
        }))
    }

    async fn update_resource(
        &self,
        request: Request<UpdateResourceRequest>,
    ) -> Result<Response<UpdateResourceResponse>, Status> {
        let req = request.into_inner();
        let resource = from_proto(
            req.resource
                .ok_or_else(|| Status::invalid_argument("resource is required"))?,
        )?;
        let workflow_id = req.workflow_id.filter(|id| !id.is_empty());

        self.repo
            .update(&resource, workflow_id.as_deref())
            .await?;
        info!(
            resource = %resource.name(),
            state = ?resource.state(),
            workflow_id = ?workflow_id,
            "Resource updated"
        );

        Ok(Response::new(UpdateResourceResponse {
            resource: Some(to_proto(&resource)),
        }))
    }

    async fn delete_resource(
        &self,
        request: Request<DeleteResourceRequest>,
    ) -> Result<Response<DeleteResourceResponse>, Status> {
        let req = request.into_inner();
        let name = parse_name(&req.name)?;

        self.repo.delete(&name).await?;
        debug!(resource = %name, "Resource deleted");

        Ok(Response::new(DeleteResourceResponse {}))
    }
}
