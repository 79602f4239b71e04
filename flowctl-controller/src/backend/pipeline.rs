//! Client for the pipeline backend.

use std::time::Duration;

use async_trait::async_trait;
use tonic::transport::Channel;

use super::{
    channel, endpoint_host, serving_status, BackendError, LivenessProbe, Page, PipelineEntry,
    PipelineLister, PipelineRecipe,
};
use crate::proto::healthcheck::LivenessRequest;
use crate::proto::pipeline::pipeline_private_service_client::PipelinePrivateServiceClient;
use crate::proto::pipeline::pipeline_public_service_client::PipelinePublicServiceClient;
use crate::proto::pipeline::{ListPipelinesAdminRequest, Pipeline, View};
use crate::resource::ServingStatus;

#[derive(Clone)]
pub struct PipelineClient {
    public: PipelinePublicServiceClient<Channel>,
    private: PipelinePrivateServiceClient<Channel>,
    host: String,
    page_size: i32,
}

impl PipelineClient {
    pub fn new(
        public_endpoint: &str,
        private_endpoint: &str,
        timeout: Duration,
        page_size: i32,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            public: PipelinePublicServiceClient::new(channel(public_endpoint, timeout)?),
            private: PipelinePrivateServiceClient::new(channel(private_endpoint, timeout)?),
            host: endpoint_host(public_endpoint)?,
            page_size,
        })
    }
}

impl From<Pipeline> for PipelineEntry {
    fn from(pipeline: Pipeline) -> Self {
        let configured = pipeline.state();
        PipelineEntry {
            name: pipeline.name,
            configured,
            recipe: pipeline.recipe.map(|recipe| PipelineRecipe {
                source: recipe.source,
                destination: recipe.destination,
                models: recipe.models,
            }),
        }
    }
}

#[async_trait]
impl PipelineLister for PipelineClient {
    async fn list(
        &self,
        page_token: Option<String>,
    ) -> Result<Page<PipelineEntry>, BackendError> {
        let mut private = self.private.clone();
        let resp = private
            .list_pipelines_admin(ListPipelinesAdminRequest {
                page_size: Some(self.page_size),
                page_token,
                view: Some(View::Full as i32),
            })
            .await?
            .into_inner();
        Ok(Page {
            items: resp.pipelines.into_iter().map(PipelineEntry::from).collect(),
            next_page_token: resp.next_page_token,
            total_size: resp.total_size,
        })
    }
}

#[async_trait]
impl LivenessProbe for PipelineClient {
    fn service(&self) -> &str {
        &self.host
    }

    async fn liveness(&self) -> Result<ServingStatus, BackendError> {
        let mut public = self.public.clone();
        let resp = public.liveness(LivenessRequest {}).await?.into_inner();
        Ok(serving_status(resp))
    }
}
