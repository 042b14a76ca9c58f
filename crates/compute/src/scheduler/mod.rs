//! Core-budgeted job scheduler.
//!
//! Jobs each hold a number of cores while they run. The [`Scheduler`] admits
//! them cheapest first against a shared [`CoreBudget`] and runs them on a
//! rayon worker pool. In balanced mode the [`planner`] first splits a batch
//! into chunks with a uniform per-job cost; after a batch the [`retry`]
//! classifier picks recoverable failures for a single corrective pass.

pub mod budget;
pub mod error;
pub mod metrics;
pub mod planner;
pub mod registry;
pub mod retry;
pub mod runner;
pub mod runners;
pub mod task;
pub mod types;

pub use budget::{CoreBudget, CoreLease};
pub use error::ScheduleError;
pub use metrics::SchedulerMetrics;
pub use planner::{chunk_jobs, plan_chunks, procs_for_remaining, Chunk, ChunkSpec, ProcBounds};
pub use registry::RunnerRegistry;
pub use retry::{remedy_for, select_retries, RetryPlan};
pub use runner::Scheduler;
pub use runners::CommandRunner;
pub use task::{RunReport, Runner};
pub use types::{BatchOutput, RetrySummary};
