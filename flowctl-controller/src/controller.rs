//! The control loop: drives every reconciler on a fixed cadence.
//!
//! ```text
//! ┌──────┐ tick  ┌─────────┐ all kinds joined ┌──────────┐
//! │ Idle │──────▶│ Probing │─────────────────▶│ Sleeping │──┐
//! └──────┘       └─────────┘                  └──────────┘  │
//!     ▲                                                      │
//!     └──────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick first checks that the store answers. While it does not, ticks
//! are skipped with exponential back-off, and the first healthy tick after an
//! outage (or after start) also runs the repopulate-only reconcilers. Those
//! stay due until every one of them completes a pass, and a pass that hits a
//! store error mid-tick makes them due again.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::naming::ResourceKind;
use crate::reconciler::{is_store_error, Reconciler, Summary};
use crate::repository::ResourceRepository;
use crate::store::StoreError;

/// When a reconciler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    EveryTick,
    /// Only on the first tick after start or after a store outage.
    Repopulate,
}

/// How one kind's pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindOutcome {
    Done(Summary),
    Failed(String),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub repopulated: bool,
    pub kinds: Vec<(ResourceKind, KindOutcome)>,
}

impl TickReport {
    pub fn outcome(&self, kind: ResourceKind) -> Option<&KindOutcome> {
        self.kinds.iter().find(|(k, _)| *k == kind).map(|(_, o)| o)
    }
}

pub struct ControlLoop {
    repo: Arc<ResourceRepository>,
    reconcilers: Vec<(Schedule, Arc<dyn Reconciler>)>,
    interval: Duration,
    tick_timeout: Duration,
    backoff_ceiling: Duration,
    needs_repopulate: bool,
}

impl ControlLoop {
    pub fn new(repo: Arc<ResourceRepository>, config: &ControllerConfig) -> Self {
        Self {
            repo,
            reconcilers: Vec::new(),
            interval: config.interval,
            tick_timeout: config.tick_timeout,
            backoff_ceiling: config.backoff_ceiling.max(config.interval),
            needs_repopulate: true,
        }
    }

    pub fn with_reconciler(mut self, schedule: Schedule, reconciler: Arc<dyn Reconciler>) -> Self {
        self.reconcilers.push((schedule, reconciler));
        self
    }

    pub fn needs_repopulate(&self) -> bool {
        self.needs_repopulate
    }

    /// Run one tick: check the store, then every due reconciler concurrently.
    /// Returns once all of them have finished or timed out.
    pub async fn tick(&mut self) -> Result<TickReport, StoreError> {
        if let Err(e) = self.repo.health().await {
            self.needs_repopulate = true;
            return Err(e);
        }

        let repopulate = self.needs_repopulate;
        let mut tasks = JoinSet::new();
        for (schedule, reconciler) in &self.reconcilers {
            if *schedule == Schedule::Repopulate && !repopulate {
                continue;
            }
            let schedule = *schedule;
            let reconciler = Arc::clone(reconciler);
            let timeout = self.tick_timeout;
            tasks.spawn(async move {
                let kind = reconciler.kind();
                let mut store_faulted = false;
                let outcome = match tokio::time::timeout(timeout, reconciler.reconcile()).await {
                    Ok(Ok(summary)) => {
                        store_faulted = summary.store_failed > 0;
                        KindOutcome::Done(summary)
                    }
                    Ok(Err(e)) => {
                        warn!(kind = %kind, "Reconcile pass failed: {:#}", e);
                        store_faulted = is_store_error(&e);
                        KindOutcome::Failed(format!("{:#}", e))
                    }
                    Err(_) => {
                        warn!(kind = %kind, timeout = ?timeout, "Reconcile pass timed out");
                        KindOutcome::TimedOut
                    }
                };
                (schedule, kind, outcome, store_faulted)
            });
        }

        let mut kinds = Vec::new();
        let mut repopulate_pending = false;
        let mut store_faulted = false;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((schedule, kind, outcome, faulted)) => {
                    if schedule == Schedule::Repopulate && !matches!(outcome, KindOutcome::Done(_))
                    {
                        repopulate_pending = true;
                    }
                    store_faulted |= faulted;
                    kinds.push((kind, outcome));
                }
                Err(e) => {
                    error!("Reconciler task panicked: {}", e);
                    repopulate_pending |= repopulate;
                }
            }
        }

        if store_faulted {
            warn!("State store errors during tick, repopulating on the next one");
        } else if repopulate_pending {
            warn!("Repopulate pass incomplete, retrying on the next tick");
        } else if repopulate {
            info!("Repopulate pass complete");
        }
        self.needs_repopulate = store_faulted || repopulate_pending;
        Ok(TickReport {
            repopulated: repopulate,
            kinds,
        })
    }

    /// Tick until `shutdown` fires. A tick in progress always runs to completion.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(interval = ?self.interval, "Control loop started");
        let mut backoff = self.interval;

        loop {
            let delay = match self.tick().await {
                Ok(report) => {
                    debug!(kinds = report.kinds.len(), "Tick complete");
                    backoff = self.interval;
                    self.interval
                }
                Err(e) => {
                    warn!(retry_in = ?backoff, "State store unavailable, skipping tick: {}", e);
                    let delay = backoff;
                    backoff = (backoff * 2).min(self.backoff_ceiling);
                    delay
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Control loop stopped");
    }
}
