//! Reconcilers, one per resource kind.
//!
//! Each reconciler lists the entities its backend knows about, derives one
//! state per entity and commits it through the [`ResourceRepository`].
//!
//! [`ResourceRepository`]: crate::repository::ResourceRepository

pub mod checked;
pub mod fanout;
pub mod paginate;
pub mod pipeline;
pub mod service;
#[cfg(test)]
pub(crate) mod testing;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::Error;
use crate::naming::ResourceKind;
use crate::store::StoreError;

pub use checked::CheckedReconciler;
pub use fanout::Summary;
pub use pipeline::{aggregate, PipelineReconciler};
pub use service::ServiceReconciler;

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The kind whose keys this reconciler writes. Each kind has exactly one writer.
    fn kind(&self) -> ResourceKind;

    /// Run one pass over every entity of the kind.
    ///
    /// Per-entity failures are isolated and counted in the summary; an error
    /// here means the pass could not start (e.g. listing failed).
    async fn reconcile(&self) -> Result<Summary>;
}

/// Whether the state store, rather than a backend, caused `e`.
pub fn is_store_error(e: &anyhow::Error) -> bool {
    e.chain().any(|cause| {
        cause.downcast_ref::<StoreError>().is_some()
            || matches!(cause.downcast_ref::<Error>(), Some(Error::Store(_)))
    })
}
