//! Client for the connector backend.

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
use crate::proto::connector::connector_private_service_client::ConnectorPrivateServiceClient;
use crate::proto::connector::connector_public_service_client::ConnectorPublicServiceClient;
use crate::proto::connector::{
    CheckConnectorRequest, CheckConnectorResponse, ListConnectorsAdminRequest,
    ListConnectorsAdminResponse,
};
use crate::proto::healthcheck::LivenessRequest;
use crate::resource::ServingStatus;

/// Client for the connector backend's public and private services.
#[derive(Clone)]
pub struct ConnectorClient {
    public: ConnectorPublicServiceClient<Channel>,
    private: ConnectorPrivateServiceClient<Channel>,
    host: String,
    page_size: i32,
}

impl ConnectorClient {
    pub fn new(
        public_endpoint: &str,
        private_endpoint: &str,
        timeout: Duration,
        page_size: i32,
    ) -> Result<Self, BackendError> {
        Ok(Self {
            public: ConnectorPublicServiceClient::new(channel(public_endpoint, timeout)?),
            private: ConnectorPrivateServiceClient::new(channel(private_endpoint, timeout)?),
            host: endpoint_host(public_endpoint)?,
            page_size,
        })
    }

    /// Status of a connector operation (source or destination).
    pub async fn get_operation(&self, workflow_id: &str) -> Result<OperationStatus, BackendError> {
        debug!(workflow_id = %workflow_id, "Polling connector operation");
        let mut public = self.public.clone();
        let result = public
            .get_connector_operation(operation_request(workflow_id))
            .await;
        operation_status(workflow_id, result)
    }

    fn list_request(&self, page_token: Option<String>) -> ListConnectorsAdminRequest {
        ListConnectorsAdminRequest {
            page_size: Some(self.page_size),
            page_token,
        }
    }
}

#[async_trait]
impl LivenessProbe for ConnectorClient {
    fn service(&self) -> &str {
        &self.host
    }

    async fn liveness(&self) -> Result<ServingStatus, BackendError> {
        let mut public = self.public.clone();
        let resp = public.liveness(LivenessRequest {}).await?.into_inner();
        Ok(serving_status(resp))
    }
}

/// [`EntityProbe`] for one side of the connector backend.
#[derive(Clone)]
pub struct ConnectorProbe {
    client: ConnectorClient,
    kind: ResourceKind,
}

impl ConnectorProbe {
    pub fn source(client: ConnectorClient) -> Self {
        Self {
            client,
            kind: ResourceKind::SourceConnector,
        }
    }

    pub fn destination(client: ConnectorClient) -> Self {
        Self {
            client,
            kind: ResourceKind::DestinationConnector,
        }
    }

    fn is_source(&self) -> bool {
        self.kind == ResourceKind::SourceConnector
    }
}

fn page(resp: ListConnectorsAdminResponse) -> Page<String> {
    Page {
        items: resp.connectors.into_iter().map(|c| c.name).collect(),
        next_page_token: resp.next_page_token,
        total_size: resp.total_size,
    }
}

fn outcome(resp: CheckConnectorResponse) -> CheckOutcome {
    CheckOutcome {
        state: resp.state,
        workflow_id: workflow_id(resp.workflow_id),
    }
}

#[async_trait]
impl EntityProbe for ConnectorProbe {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    async fn list(&self, page_token: Option<String>) -> Result<Page<String>, BackendError> {
        let mut private = self.client.private.clone();
        let req = self.client.list_request(page_token);
        let resp = if self.is_source() {
            private.list_source_connectors_admin(req).await?
        } else {
            private.list_destination_connectors_admin(req).await?
        };
        Ok(page(resp.into_inner()))
    }

    async fn check(&self, name: &str) -> Result<CheckOutcome, BackendError> {
        let mut private = self.client.private.clone();
        let req = CheckConnectorRequest {
            name: name.to_string(),
        };
        let resp = if self.is_source() {
            private.check_source_connector(req).await?
        } else {
            private.check_destination_connector(req).await?
        };
        Ok(outcome(resp.into_inner()))
    }
}
