//! Bounded per-entity fan-out.
//!
//! Tasks are spawned only once a permit is held, so a listing of thousands of
//! entities never turns into thousands of parked tasks.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

use super::is_store_error;
use crate::naming::ResourceKind;

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub seen: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Failures caused by the state store rather than the backend.
    pub store_failed: usize,
}

/// Run `task` once per item with at most `limit` running at a time, and wait
/// for all of them. A failing or panicking task never affects its siblings.
pub async fn for_each_bounded<T, F, Fut>(
    kind: ResourceKind,
    items: Vec<T>,
    limit: usize,
    task: F,
) -> Summary
where
    T: Send + 'static,
    F: Fn(T) -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();
    let mut summary = Summary {
        seen: items.len(),
        ..Summary::default()
    };

    for item in items {
        // The semaphore is never closed.
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let fut = task(item);
        tasks.spawn(async move {
            let result = fut.await;
            drop(permit);
            result
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(())) => summary.succeeded += 1,
            Ok(Err(e)) => {
                summary.failed += 1;
                if is_store_error(&e) {
                    summary.store_failed += 1;
                }
                warn!(kind = %kind, "Reconcile failed: {:#}", e);
            }
            Err(e) => {
                summary.failed += 1;
                warn!(kind = %kind, "Reconcile task aborted: {}", e);
            }
        }
    }

    summary
}
