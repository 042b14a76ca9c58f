use qmpar_core::ConfigError;

/// Errors that abort a whole scheduling call.
///
/// Failures of individual job-types are not errors at this level; they are
/// recorded in the job's outcomes.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Requested {requested} cores from a budget of {total}")]
    BudgetExceeded { requested: usize, total: usize },
    #[error("Consistency error: {0}")]
    Consistency(String),
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(String),
    #[error("Shutdown requested with {pending} jobs not dispatched")]
    Shutdown { pending: usize },
}

impl ScheduleError {
    /// Whether the error was detected before any job was dispatched.
    pub fn is_config(&self) -> bool {
        matches!(self, ScheduleError::Config(_) | ScheduleError::BudgetExceeded { .. })
    }
}
