//! Liveness-only clients: the management backend and the inference server.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Channel;

use super::{channel, endpoint_host, serving_status, BackendError, LivenessProbe};
use crate::proto::healthcheck::LivenessRequest;
use crate::proto::inference::grpc_inference_service_client::GrpcInferenceServiceClient;
use crate::proto::inference::ServerLiveRequest;
use crate::proto::mgmt::mgmt_public_service_client::MgmtPublicServiceClient;
use crate::resource::ServingStatus;

#[derive(Clone)]
pub struct MgmtClient {
    public: MgmtPublicServiceClient<Channel>,
    host: String,
}

impl MgmtClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            public: MgmtPublicServiceClient::new(channel(endpoint, timeout)?),
            host: endpoint_host(endpoint)?,
        })
    }
}

#[async_trait]
impl LivenessProbe for MgmtClient {
    fn service(&self) -> &str {
        &self.host
    }

    async fn liveness(&self) -> Result<ServingStatus, BackendError> {
        let mut public = self.public.clone();
        let resp = public.liveness(LivenessRequest {}).await?.into_inner();
        Ok(serving_status(resp))
    }
}

/// Inference server. Its health API is a bare `live` flag.
#[derive(Clone)]
pub struct InferenceClient {
    client: GrpcInferenceServiceClient<Channel>,
    host: String,
}

impl InferenceClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, BackendError> {
        Ok(Self {
            client: GrpcInferenceServiceClient::new(channel(endpoint, timeout)?),
            host: endpoint_host(endpoint)?,
        })
    }
}

#[async_trait]
impl LivenessProbe for InferenceClient {
    fn service(&self) -> &str {
        &self.host
    }

    async fn liveness(&self) -> Result<ServingStatus, BackendError> {
        let mut client = self.client.clone();
        let resp = client.server_live(ServerLiveRequest {}).await?.into_inner();
        Ok(if resp.live {
            ServingStatus::Serving
        } else {
            ServingStatus::NotServing
        })
    }
}
