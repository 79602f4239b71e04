//! Client for the model backend.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Channel;
use tracing::debug;

use super::operation::{operation_request, operation_status};
use super::{
    channel, endpoint_host, serving_status, workflow_id, BackendError, CheckOutcome, EntityProbe,
    LivenessProbe, OperationStatus, Page,
};
use crate::naming::ResourceKind;
use crate::proto::healthcheck::LivenessRequest;
use crate::proto::model::model_private_service_client::ModelPrivateServiceClient;
use crate::proto::model::model_public_service_client::ModelPublicServiceClient;
use crate::proto::model::{CheckModelRequest, ListModelsAdminRequest};
use crate::resource::ServingStatus;

/// Client for the model backend's public and private services.
#[derive(Clone)]
pub struct ModelClient {
    public: ModelPublicServiceClient<Channel>,
    private: ModelPrivateServiceClient<Channel>,
    host: String,
    page_size: i32,
}

impl ModelClient {
    pub fn new(
        public_endpoint: &str,
        private_endpoint: &str,
        timeout: Duration,
        page_size: i32,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            public: ModelPublicServiceClient::new(channel(public_endpoint, timeout)?),
            private: ModelPrivateServiceClient::new(channel(private_endpoint, timeout)?),
            host: endpoint_host(public_endpoint)?,
            page_size,
        })
    }

    /// Status of a model operation.
    pub async fn get_operation(&self, workflow_id: &str) -> Result<OperationStatus, BackendError> {
        debug!(workflow_id = %workflow_id, "Polling model operation");
        let mut public = self.public.clone();
        let result = public
            .get_model_operation(operation_request(workflow_id))
            .await;
        operation_status(workflow_id, result)
    }
}

#[async_trait]
impl EntityProbe for ModelClient {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Model
    }

    async fn list(&self, page_token: Option<String>) -> Result<Page<String>, BackendError> {
        let mut private = self.private.clone();
        let resp = private
            .list_models_admin(ListModelsAdminRequest {
                page_size: Some(self.page_size),
                page_token,
            })
            .await?
            .into_inner();
        Ok(Page {
            items: resp.models.into_iter().map(|m| m.name).collect(),
            next_page_token: resp.next_page_token,
            total_size: resp.total_size,
        })
    }

    async fn check(&self, name: &str) -> Result<CheckOutcome, BackendError> {
        let mut private = self.private.clone();
        let resp = private
            .check_model(CheckModelRequest {
                name: name.to_string(),
            })
            .await?
            .into_inner();
        Ok(CheckOutcome {
            state: resp.state,
            workflow_id: workflow_id(resp.workflow_id),
        })
    }
}

#[async_trait]
impl LivenessProbe for ModelClient {
    fn service(&self) -> &str {
        &self.host
    }

    async fn liveness(&self) -> Result<ServingStatus, BackendError> {
        let mut public = self.public.clone();
        let resp = public.liveness(LivenessRequest {}).await?.into_inner();
        Ok(serving_status(resp))
    }
}
