use qmpar_core::{Job, ResultSet};
use serde::Serialize;

/// Jobs of one finished batch together with their merged outcomes.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    /// Finished jobs, in completion order.
    pub jobs: Vec<Job>,
    pub results: ResultSet,
}

impl BatchOutput {
    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        let mut results = ResultSet::new();
        for job in &jobs {
            results.insert(job.id, job.results());
        }
        Self { jobs, results }
    }

    /// Append another batch; its outcomes win on overlap.
    pub fn extend(&mut self, other: BatchOutput) {
        self.jobs.extend(other.jobs);
        self.results.merge(other.results);
    }
}

/// Outcome of retry resolution, reported after the retry pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RetrySummary {
    /// Jobs resubmitted with corrective flags.
    pub retried: usize,
    /// Subjects still carrying a failed job-type.
    pub terminal_failed: usize,
}
