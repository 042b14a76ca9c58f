use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration problems. Detected before any job is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No program configured; cannot select a runner")]
    ProgramUnset,

    #[error("Unknown program: {0}")]
    UnknownProgram(String),

    #[error("Runner for program '{0}' is already registered")]
    DuplicateProgram(String),

    #[error("Job for subject {subject} needs {cost} cores but the budget is {budget}")]
    CostExceedsBudget {
        subject: String,
        cost: usize,
        budget: usize,
    },

    #[error("Job for subject {0} has a cost of zero cores")]
    ZeroCost(String),

    #[error("Job for subject {0} has no job types")]
    EmptyJobTypes(String),

    #[error("Invalid OMP range: omp_min={min}, omp_max={max}")]
    InvalidOmpRange { min: usize, max: usize },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Failed to read config {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),
}
