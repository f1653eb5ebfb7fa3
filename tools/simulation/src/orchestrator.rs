//! Bounded-concurrency session orchestrator
//!
//! Every session becomes a task that queues on a semaphore for one of
//! `max_concurrency` slots. Outcomes flow back through a single channel with
//! the orchestrator as its only consumer. A worker that panics is converted
//! into a failed outcome for its trader; siblings keep running.

use crate::session::{SessionConfig, SessionOutcome, SessionWorker};
use crate::transport::Connector;
use futures::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info};
use types::errors::SessionError;
use types::ids::TraderId;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// One outcome per requested session, in completion order
    pub outcomes: Vec<SessionOutcome>,
    /// Wall-clock time of the whole run
    pub wall_clock: Duration,
    /// Most sessions observed holding a slot at once
    pub peak_concurrency: usize,
}

/// Counts sessions currently holding a slot.
#[derive(Debug, Default)]
struct ActiveGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActiveGauge {
    fn enter(self: &Arc<Self>) -> ActiveGuard {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard { gauge: Arc::clone(self) }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveGuard {
    gauge: Arc<ActiveGauge>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.gauge.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs sessions with at most `max_concurrency` active at any instant.
pub struct Orchestrator<C> {
    worker: SessionWorker<C>,
    max_concurrency: usize,
}

impl<C: Connector> Orchestrator<C> {
    /// A `max_concurrency` of zero is treated as one.
    pub fn new(connector: Arc<C>, max_concurrency: usize) -> Self {
        Self {
            worker: SessionWorker::new(connector),
            max_concurrency: max_concurrency.clamp(1, Semaphore::MAX_PERMITS),
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run every session and return exactly one outcome per config.
    pub async fn run_all(&self, configs: Vec<SessionConfig>) -> Vec<SessionOutcome> {
        self.run(configs).await.outcomes
    }

    /// Run every session, collecting outcomes and run-level timing.
    pub async fn run(&self, configs: Vec<SessionConfig>) -> RunResult {
        self.run_with(configs, |_| {}).await
    }

    /// Like `run`, calling `on_outcome` for each outcome as it completes.
    pub async fn run_with<F>(&self, configs: Vec<SessionConfig>, mut on_outcome: F) -> RunResult
    where
        F: FnMut(&SessionOutcome),
    {
        let started = Instant::now();
        let requested = configs.len();
        info!(sessions = requested, max_concurrency = self.max_concurrency, "starting run");

        let mut pending: HashMap<TraderId, usize> = HashMap::with_capacity(requested);
        for config in &configs {
            *pending.entry(config.trader_id.clone()).or_insert(0) += 1;
        }

        let slots = Arc::new(Semaphore::new(self.max_concurrency));
        let gauge = Arc::new(ActiveGauge::default());
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionOutcome>();
        let mut tasks = JoinSet::new();

        for config in configs {
            let slots = Arc::clone(&slots);
            let gauge = Arc::clone(&gauge);
            let worker = self.worker.clone();
            let tx = tx.clone();
            tasks.spawn(async move {
                let outcome = run_in_slot(worker, config, slots, gauge).await;
                // Receiver lives until every sender is gone.
                let _ = tx.send(outcome);
            });
        }
        drop(tx);

        let mut outcomes = Vec::with_capacity(requested);
        while let Some(outcome) = rx.recv().await {
            settle(&mut pending, &outcome.trader_id);
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!(error = %err, "session task lost");
            }
        }

        // Tasks that died without reporting still owe an outcome.
        let wall_clock = started.elapsed();
        for (trader_id, missing) in pending {
            for _ in 0..missing {
                let outcome = SessionOutcome::failed(
                    trader_id.clone(),
                    wall_clock,
                    SessionError::WorkerFault {
                        reason: "session task ended without an outcome".to_string(),
                    },
                );
                on_outcome(&outcome);
                outcomes.push(outcome);
            }
        }

        info!(
            sessions = outcomes.len(),
            elapsed_ms = wall_clock.as_millis() as u64,
            peak_concurrency = gauge.peak(),
            "run complete"
        );

        RunResult {
            outcomes,
            wall_clock,
            peak_concurrency: gauge.peak(),
        }
    }
}

/// Wait for a slot, run the worker, turn a panic into a failed outcome.
async fn run_in_slot<C: Connector>(
    worker: SessionWorker<C>,
    config: SessionConfig,
    slots: Arc<Semaphore>,
    gauge: Arc<ActiveGauge>,
) -> SessionOutcome {
    let queued_at = Instant::now();
    let _permit = match slots.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            return SessionOutcome::failed(
                config.trader_id.clone(),
                queued_at.elapsed(),
                SessionError::WorkerFault { reason: "concurrency limiter closed".to_string() },
            )
        }
    };
    let _active = gauge.enter();
    debug!(trader = %config.trader_id, waited_ms = queued_at.elapsed().as_millis() as u64, "slot acquired");

    let started = Instant::now();
    match AssertUnwindSafe(worker.run(&config)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            error!(trader = %config.trader_id, reason = %reason, "session worker panicked");
            SessionOutcome::failed(
                config.trader_id.clone(),
                started.elapsed(),
                SessionError::WorkerFault { reason },
            )
        }
    }
}

fn settle(pending: &mut HashMap<TraderId, usize>, trader_id: &TraderId) {
    if let Some(count) = pending.get_mut(trader_id) {
        *count -= 1;
        if *count == 0 {
            pending.remove(trader_id);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
