//! Reconciler for kinds with a check RPC: models and both connector kinds.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::fanout::{for_each_bounded, Summary};
use super::paginate::drain_pages;
use super::Reconciler;
use crate::backend::{BackendError, EntityProbe, OperationPoller};
use crate::naming::{ResourceKind, ResourceName};
use crate::repository::ResourceRepository;
use crate::resource::ResourceState;

/// Derives each entity's state from its in-flight operation, or from a fresh
/// check when none is recorded.
#[derive(Clone)]
pub struct CheckedReconciler {
    probe: Arc<dyn EntityProbe>,
    poller: Arc<dyn OperationPoller>,
    repo: Arc<ResourceRepository>,
    concurrency: usize,
}

impl CheckedReconciler {
    pub fn new(
        probe: Arc<dyn EntityProbe>,
        poller: Arc<dyn OperationPoller>,
        repo: Arc<ResourceRepository>,
        concurrency: usize,
    ) -> Self {
        Self {
            probe,
            poller,
            repo,
            concurrency,
        }
    }

    async fn reconcile_entity(&self, entity: &str) -> Result<()> {
        let kind = self.probe.kind();
        let name = ResourceName::from_entity(entity, kind);

        if let Some(workflow_id) = self.repo.workflow(&name).await? {
            match self.poller.poll(&workflow_id, kind).await {
                Ok(status) if !status.done => {
                    debug!(resource = %name, workflow_id = %workflow_id, "Operation still running");
                    self.repo
                        .commit(&name, ResourceState::unspecified(kind))
                        .await?;
                    return Ok(());
                }
                Ok(status) => {
                    let state = match status.result {
                        Some(value) => ResourceState::from_value(kind, value)?,
                        None => {
                            warn!(resource = %name, workflow_id = %workflow_id, "Operation finished without a state");
                            ResourceState::error(kind)
                        }
                    };
                    self.repo.commit(&name, state).await?;
                    self.repo.delete_workflow(&name).await?;
                    return Ok(());
                }
                Err(BackendError::OperationNotFound(_)) => {
                    warn!(resource = %name, workflow_id = %workflow_id, "Operation no longer exists, dropping reference");
                    self.repo.delete_workflow(&name).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let outcome = self.probe.check(entity).await?;
        match outcome.workflow_id {
            Some(workflow_id) => {
                self.repo.put_workflow(&name, &workflow_id).await?;
                self.repo
                    .commit(&name, ResourceState::unspecified(kind))
                    .await?;
            }
            None => {
                let state = ResourceState::from_value(kind, outcome.state)?;
                self.repo.commit(&name, state).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Reconciler for CheckedReconciler {
    fn kind(&self) -> ResourceKind {
        self.probe.kind()
    }

    async fn reconcile(&self) -> Result<Summary> {
        let kind = self.probe.kind();
        let entities = drain_pages(|token| self.probe.list(token))
            .await
            .with_context(|| format!("Failed to list {} entities", kind))?;

        let summary = for_each_bounded(kind, entities, self.concurrency, |entity| {
            let this = self.clone();
            async move {
                this.reconcile_entity(&entity)
                    .await
                    .with_context(|| format!("{} {}", kind, entity))
            }
        })
        .await;

        info!(
            kind = %kind,
            seen = summary.seen,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Reconciled"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::testing::{repository, FakeOperation, FakePoller, FakeProbe};
    use crate::resource::{ConnectorState, ModelState};

    fn reconciler(
        probe: FakeProbe,
        poller: FakePoller,
        repo: Arc<ResourceRepository>,
    ) -> (Arc<FakeProbe>, CheckedReconciler) {
        let probe = Arc::new(probe);
        let reconciler = CheckedReconciler::new(probe.clone(), Arc::new(poller), repo, 4);
        (probe, reconciler)
    }

    async fn state_of(repo: &ResourceRepository, name: &ResourceName) -> Option<ResourceState> {
        repo.get(name).await.unwrap().map(|r| r.state())
    }

    #[tokio::test]
    async fn test_commits_checked_state_for_every_page() {
        let (_kv, repo) = repository();
        let probe = FakeProbe::new(ResourceKind::Model, &["models/a", "models/b", "models/c"])
            .state("models/a", ModelState::Online as i32)
            .state("models/b", ModelState::Offline as i32)
            .state("models/c", ModelState::Error as i32);
        let (_, reconciler) = reconciler(probe, FakePoller::default(), repo.clone());

        let summary = reconciler.reconcile().await.unwrap();

        assert_eq!(summary.succeeded, 3);
        assert_eq!(
            state_of(&repo, &ResourceName::new("a", ResourceKind::Model)).await,
            Some(ResourceState::Model(ModelState::Online))
        );
        assert_eq!(
            state_of(&repo, &ResourceName::new("c", ResourceKind::Model)).await,
            Some(ResourceState::Model(ModelState::Error))
        );
    }

    #[tokio::test]
    async fn test_running_operation_leaves_unspecified_and_keeps_reference() {
        let (_kv, repo) = repository();
        let name = ResourceName::new("http", ResourceKind::SourceConnector);
        repo.commit(&name, ResourceState::SourceConnector(ConnectorState::Connected))
            .await
            .unwrap();
        repo.put_workflow(&name, "wf-1").await.unwrap();

        let probe = FakeProbe::new(ResourceKind::SourceConnector, &["source-connectors/http"]);
        let poller = FakePoller::default().with("wf-1", FakeOperation::Running);
        let (probe, reconciler) = reconciler(probe, poller, repo.clone());

        reconciler.reconcile().await.unwrap();

        assert_eq!(
            state_of(&repo, &name).await,
            Some(ResourceState::SourceConnector(ConnectorState::Unspecified))
        );
        assert_eq!(repo.workflow(&name).await.unwrap().as_deref(), Some("wf-1"));
        assert!(probe.checked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finished_operation_commits_result_and_clears_reference() {
        let (_kv, repo) = repository();
        let name = ResourceName::new("csv", ResourceKind::DestinationConnector);
        repo.put_workflow(&name, "wf-2").await.unwrap();

        let probe = FakeProbe::new(
            ResourceKind::DestinationConnector,
            &["destination-connectors/csv"],
        );
        let poller = FakePoller::default().with(
            "wf-2",
            FakeOperation::Done(Some(ConnectorState::Connected as i32)),
        );
        let (_, reconciler) = reconciler(probe, poller, repo.clone());

        reconciler.reconcile().await.unwrap();

        assert_eq!(
            state_of(&repo, &name).await,
            Some(ResourceState::DestinationConnector(
                ConnectorState::Connected
            ))
        );
        assert_eq!(repo.workflow(&name).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_finished_operation_without_state_is_error() {
        let (_kv, repo) = repository();
        let name = ResourceName::new("m", ResourceKind::Model);
        repo.put_workflow(&name, "wf").await.unwrap();

        let probe = FakeProbe::new(ResourceKind::Model, &["models/m"]);
        let poller = FakePoller::default().with("wf", FakeOperation::Done(None));
        let (_, reconciler) = reconciler(probe, poller, repo.clone());

        reconciler.reconcile().await.unwrap();

        assert_eq!(
            state_of(&repo, &name).await,
            Some(ResourceState::Model(ModelState::Error))
        );
        assert_eq!(repo.workflow(&name).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_operation_falls_back_to_check() {
        let (_kv, repo) = repository();
        let name = ResourceName::new("m", ResourceKind::Model);
        repo.put_workflow(&name, "gone").await.unwrap();

        let probe = FakeProbe::new(ResourceKind::Model, &["models/m"])
            .state("models/m", ModelState::Online as i32);
        let poller = FakePoller::default().with("gone", FakeOperation::Expired);
        let (probe, reconciler) = reconciler(probe, poller, repo.clone());

        reconciler.reconcile().await.unwrap();

        assert_eq!(*probe.checked.lock().unwrap(), vec!["models/m".to_string()]);
        assert_eq!(
            state_of(&repo, &name).await,
            Some(ResourceState::Model(ModelState::Online))
        );
        assert_eq!(repo.workflow(&name).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_check_starting_workflow_records_reference() {
        let (_kv, repo) = repository();
        let probe = FakeProbe::new(ResourceKind::SourceConnector, &["source-connectors/s3"])
            .outcome(
                "source-connectors/s3",
                ConnectorState::Connected as i32,
                Some("wf-new"),
            );
        let (_, reconciler) = reconciler(probe, FakePoller::default(), repo.clone());

        reconciler.reconcile().await.unwrap();

        let name = ResourceName::new("s3", ResourceKind::SourceConnector);
        assert_eq!(
            state_of(&repo, &name).await,
            Some(ResourceState::SourceConnector(ConnectorState::Unspecified))
        );
        assert_eq!(
            repo.workflow(&name).await.unwrap().as_deref(),
            Some("wf-new")
        );
    }

    #[tokio::test]
    async fn test_failed_check_leaves_state_and_spares_siblings() {
        let (_kv, repo) = repository();
        let broken = ResourceName::new("broken", ResourceKind::Model);
        repo.commit(&broken, ResourceState::Model(ModelState::Online))
            .await
            .unwrap();

        let probe = FakeProbe::new(ResourceKind::Model, &["models/broken", "models/ok"])
            .state("models/ok", ModelState::Offline as i32);
        let (_, reconciler) = reconciler(probe, FakePoller::default(), repo.clone());

        let summary = reconciler.reconcile().await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(
            state_of(&repo, &broken).await,
            Some(ResourceState::Model(ModelState::Online))
        );
        assert_eq!(
            state_of(&repo, &ResourceName::new("ok", ResourceKind::Model)).await,
            Some(ResourceState::Model(ModelState::Offline))
        );
    }

    #[tokio::test]
    async fn test_out_of_range_state_is_not_coerced() {
        let (_kv, repo) = repository();
        let probe = FakeProbe::new(ResourceKind::Model, &["models/odd"]).state("models/odd", 42);
        let (_, reconciler) = reconciler(probe, FakePoller::default(), repo.clone());

        let summary = reconciler.reconcile().await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(
            state_of(&repo, &ResourceName::new("odd", ResourceKind::Model)).await,
            None
        );
    }
}
