//! Operation polling against the backend that owns a resource kind.

use async_trait::async_trait;
use tonic::{Code, Status};
use tracing::debug;

use super::{BackendError, ConnectorClient, ModelClient, OperationPoller, OperationStatus};
use crate::naming::ResourceKind;
use crate::proto::operation::{GetOperationRequest, GetOperationResponse};

/// `operations/<workflow-id>`
pub(crate) fn operation_request(workflow_id: &str) -> GetOperationRequest {
    GetOperationRequest {
        name: format!("operations/{}", workflow_id),
    }
}

/// Map a get-operation RPC result to an [`OperationStatus`].
pub(crate) fn operation_status(
    workflow_id: &str,
    result: Result<tonic::Response<GetOperationResponse>, Status>,
) -> Result<OperationStatus, BackendError> {
    let resp = match result {
        Ok(resp) => resp.into_inner(),
        Err(status) if status.code() == Code::NotFound => {
            return Err(BackendError::OperationNotFound(workflow_id.to_string()));
        }
        Err(status) => return Err(status.into()),
    };
    let operation = resp.operation.ok_or_else(|| {
        BackendError::MalformedResponse(format!("operation {} missing from response", workflow_id))
    })?;
    if operation.done && operation.state.is_none() && !operation.error.is_empty() {
        debug!(workflow_id = %workflow_id, error = %operation.error, "Operation finished with error");
    }
    Ok(OperationStatus {
        done: operation.done,
        result: operation.state,
    })
}

/// [`OperationPoller`] dispatching on resource kind: models go to the model
/// backend, both connector kinds to the connector backend.
#[derive(Clone)]
pub struct GrpcOperationPoller {
    model: ModelClient,
    connector: ConnectorClient,
}

impl GrpcOperationPoller {
    pub fn new(model: ModelClient, connector: ConnectorClient) -> Self {
        Self { model, connector }
    }
}

#[async_trait]
impl OperationPoller for GrpcOperationPoller {
    async fn poll(
        &self,
        workflow_id: &str,
        kind: ResourceKind,
    ) -> Result<OperationStatus, BackendError> {
        match kind {
            ResourceKind::Model => self.model.get_operation(workflow_id).await,
            ResourceKind::SourceConnector | ResourceKind::DestinationConnector => {
                self.connector.get_operation(workflow_id).await
            }
            ResourceKind::Pipeline | ResourceKind::Service => {
                Err(BackendError::UnsupportedKind(kind))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::operation::Operation;

    fn response(done: bool, state: Option<i32>) -> Result<tonic::Response<GetOperationResponse>, Status> {
        Ok(tonic::Response::new(GetOperationResponse {
            operation: Some(Operation {
                name: "operations/wf".to_string(),
                done,
                state,
                error: String::new(),
            }),
        }))
    }

    #[test]
    fn test_operation_request_name() {
        assert_eq!(operation_request("abc").name, "operations/abc");
    }

    #[test]
    fn test_running_operation() {
        let status = operation_status("wf", response(false, None)).unwrap();
        assert_eq!(
            status,
            OperationStatus {
                done: false,
                result: None
            }
        );
    }

    #[test]
    fn test_done_operation_carries_state() {
        let status = operation_status("wf", response(true, Some(2))).unwrap();
        assert!(status.done);
        assert_eq!(status.result, Some(2));
    }

    #[test]
    fn test_not_found_maps_to_operation_not_found() {
        let err = operation_status("wf", Err(Status::not_found("expired"))).unwrap_err();
        assert!(matches!(err, BackendError::OperationNotFound(id) if id == "wf"));
    }

    #[test]
    fn test_other_status_is_rpc_error() {
        let err = operation_status("wf", Err(Status::unavailable("down"))).unwrap_err();
        assert!(matches!(err, BackendError::Rpc(s) if s.code() == Code::Unavailable));
    }

    #[test]
    fn test_missing_operation_is_malformed() {
        let err = operation_status(
            "wf",
            Ok(tonic::Response::new(GetOperationResponse { operation: None })),
        )
        .unwrap_err();
        assert!(matches!(err, BackendError::MalformedResponse(_)));
    }
}
