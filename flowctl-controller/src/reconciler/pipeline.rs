//! Pipeline reconciler: folds dependency states into one pipeline state.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use super::fanout::{for_each_bounded, Summary};
use super::paginate::drain_pages;
use super::Reconciler;
use crate::backend::{PipelineEntry, PipelineLister};
use crate::naming::{ResourceKind, ResourceName};
use crate::repository::ResourceRepository;
use crate::resource::{Health, PipelineState, ResourceState};

/// Pipeline state from its dependency states, in declaration order.
///
/// The first dependency that is not healthy decides: down gives INACTIVE,
/// unsettled gives UNSPECIFIED, failed gives ERROR. All healthy gives ACTIVE.
pub fn aggregate(dependencies: &[ResourceState]) -> PipelineState {
    for dep in dependencies {
        match dep.health() {
            Health::Healthy => continue,
            Health::Down => return PipelineState::Inactive,
            Health::Unknown => return PipelineState::Unspecified,
            Health::Failed => return PipelineState::Error,
        }
    }
    PipelineState::Active
}

#[derive(Clone)]
pub struct PipelineReconciler {
    lister: Arc<dyn PipelineLister>,
    repo: Arc<ResourceRepository>,
    concurrency: usize,
}

impl PipelineReconciler {
    pub fn new(
        lister: Arc<dyn PipelineLister>,
        repo: Arc<ResourceRepository>,
        concurrency: usize,
    ) -> Self {
        Self {
            lister,
            repo,
            concurrency,
        }
    }

    async fn derive(&self, entry: &PipelineEntry) -> Result<PipelineState> {
        if entry.configured == PipelineState::Inactive {
            return Ok(PipelineState::Inactive);
        }

        let Some(dependencies) = entry.dependencies() else {
            warn!(pipeline = %entry.name, "Pipeline has no recipe");
            return Ok(PipelineState::Error);
        };

        let mut states = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            match self.repo.get(&dep).await? {
                Some(resource) => states.push(resource.state()),
                None => {
                    warn!(pipeline = %entry.name, dependency = %dep, "Dependency has no recorded state");
                    return Ok(PipelineState::Error);
                }
            }
        }
        Ok(aggregate(&states))
    }

    async fn reconcile_pipeline(&self, entry: &PipelineEntry) -> Result<()> {
        let name = ResourceName::from_entity(&entry.name, ResourceKind::Pipeline);
        let state = self.derive(entry).await?;
        self.repo
            .commit(&name, ResourceState::Pipeline(state))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Reconciler for PipelineReconciler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Pipeline
    }

    async fn reconcile(&self) -> Result<Summary> {
        let entries = drain_pages(|token| self.lister.list(token))
            .await
            .context("Failed to list pipelines")?;

        let summary = for_each_bounded(
            ResourceKind::Pipeline,
            entries,
            self.concurrency,
            |entry| {
                let this = self.clone();
                async move {
                    this.reconcile_pipeline(&entry)
                        .await
                        .with_context(|| format!("pipeline {}", entry.name))
                }
            },
        )
        .await;

        info!(
            kind = %ResourceKind::Pipeline,
            seen = summary.seen,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Reconciled"
        );
        Ok(summary)
    }
}
