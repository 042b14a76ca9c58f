use std::path::PathBuf;

use indexmap::IndexMap;
use qmpar_core::{Job, JobError, JobOutcome, JobType};

/// What a [`Runner`] produced for one job.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub outcomes: IndexMap<JobType, JobOutcome>,
    /// Guess artifact written by the program, if any.
    pub artifact_path: Option<PathBuf>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, job_type: JobType, outcome: JobOutcome) -> Self {
        self.outcomes.insert(job_type, outcome);
        self
    }

    pub fn with_artifact(mut self, path: PathBuf) -> Self {
        self.artifact_path = Some(path);
        self
    }

    /// Report the same failure for every pending job-type of `job`.
    pub fn all_failed(job: &Job, error: JobError) -> Self {
        Self {
            outcomes: job
                .job_types
                .iter()
                .map(|jt| (*jt, JobOutcome::failed(error.clone())))
                .collect(),
            artifact_path: None,
        }
    }
}

/// Program-specific executor for jobs.
///
/// `run` is invoked concurrently from several worker threads, each with its
/// own job, and must use at most `job.cost` cores.
pub trait Runner: Send + Sync {
    /// Program name this runner is registered under.
    fn program(&self) -> &str;

    /// Execute every pending job-type of `job`.
    fn run(&self, job: &Job) -> RunReport;
}
