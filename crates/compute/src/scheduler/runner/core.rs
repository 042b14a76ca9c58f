use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::scheduler::budget::CoreBudget;
use crate::scheduler::error::ScheduleError;
use crate::scheduler::metrics::SchedulerMetrics;
use crate::scheduler::registry::RunnerRegistry;
use crate::scheduler::task::Runner;

/// The core budget scheduler. Runs every job of a batch exactly once while
/// the cores held by running jobs never exceed the budget.
pub struct Scheduler {
    /// Executor for the configured program.
    pub(super) runner: Arc<dyn Runner>,
    /// Free-core counter shared with running jobs.
    pub(super) budget: CoreBudget,
    /// Scheduler metrics.
    pub(super) metrics: Arc<RwLock<SchedulerMetrics>>,
    /// Shutdown signal. Stops admission of further jobs.
    pub(super) shutdown: Arc<AtomicBool>,
    /// Jobs currently executing.
    pub(super) active_jobs: Arc<AtomicUsize>,
}

impl Scheduler {
    /// Create a scheduler for `runner` drawing cores from `budget`.
    pub fn new(runner: Arc<dyn Runner>, budget: CoreBudget) -> Self {
        Self {
            runner,
            budget,
            metrics: Arc::new(RwLock::new(SchedulerMetrics::default())),
            shutdown: Arc::new(AtomicBool::new(false)),
            active_jobs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Select the runner for `program`, failing before anything is dispatched
    /// if it is unknown.
    pub fn for_program(
        registry: &RunnerRegistry,
        program: &str,
        budget: CoreBudget,
    ) -> Result<Self, ScheduleError> {
        let runner = registry.resolve(program)?;
        info!(program, cores = budget.total(), "Scheduler created");
        Ok(Self::new(runner, budget))
    }

    /// Share an externally owned shutdown flag.
    pub fn with_shutdown(mut self, shutdown: Arc<AtomicBool>) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Share an externally owned metrics handle.
    pub fn with_metrics(mut self, metrics: Arc<RwLock<SchedulerMetrics>>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn program(&self) -> &str {
        self.runner.program()
    }

    pub fn budget(&self) -> &CoreBudget {
        &self.budget
    }

    /// Number of jobs executing right now.
    pub fn active_jobs(&self) -> usize {
        self.active_jobs.load(Ordering::Relaxed)
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        match self.metrics.read() {
            Ok(m) => m.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Signal the scheduler to stop admitting jobs.
    pub fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Get an Arc to the shutdown flag (for external shutdown signaling).
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }
}
