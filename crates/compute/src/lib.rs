pub mod engine;
pub mod scheduler;

pub use engine::{Execution, ParallelEngine};
pub use scheduler::{
    CoreBudget, RetrySummary, RunReport, Runner, RunnerRegistry, ScheduleError, Scheduler,
    SchedulerMetrics,
};
