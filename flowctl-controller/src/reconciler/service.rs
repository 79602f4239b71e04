//! Backend service liveness reconciler.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use super::fanout::{for_each_bounded, Summary};
use super::Reconciler;
use crate::backend::LivenessProbe;
use crate::naming::{ResourceKind, ResourceName};
use crate::repository::ResourceRepository;
use crate::resource::{ResourceState, ServingStatus};

/// Records each backend's serving status under its hostname.
/// A backend that cannot be reached is NOT_SERVING.
pub struct ServiceReconciler {
    probes: Vec<Arc<dyn LivenessProbe>>,
    repo: Arc<ResourceRepository>,
}

impl ServiceReconciler {
    pub fn new(probes: Vec<Arc<dyn LivenessProbe>>, repo: Arc<ResourceRepository>) -> Self {
        Self { probes, repo }
    }
}

async fn probe_service(probe: &dyn LivenessProbe, repo: &ResourceRepository) -> Result<()> {
    let name = ResourceName::from_entity(probe.service(), ResourceKind::Service);
    let status = match probe.liveness().await {
        Ok(status) => status,
        Err(e) => {
            warn!(service = %probe.service(), "Liveness probe failed: {}", e);
            ServingStatus::NotServing
        }
    };
    repo.commit(&name, ResourceState::Service(status)).await?;
    Ok(())
}

#[async_trait]
impl Reconciler for ServiceReconciler {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    async fn reconcile(&self) -> Result<Summary> {
        let probes = self.probes.clone();
        let limit = probes.len();
        let summary = for_each_bounded(ResourceKind::Service, probes, limit, |probe| {
            let repo = self.repo.clone();
            async move { probe_service(probe.as_ref(), &repo).await }
        })
        .await;

        info!(
            kind = %ResourceKind::Service,
            seen = summary.seen,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Reconciled"
        );
        Ok(summary)
    }
}
