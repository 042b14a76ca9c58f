//! Retry classification.
//!
//! After a batch, failed job-types whose error has a known remedy are flagged
//! and their jobs collected for a single retry pass. Job-types that already
//! succeeded, and failures without a remedy, are dropped from the retried job
//! so that the retry only repeats what can now succeed.

use qmpar_core::{Job, JobError, JobType, Remedy, SubjectId};
use tracing::debug;

/// Job-types whose failures may be remedied.
pub const RECOVERABLE_JOB_TYPES: [JobType; 2] = [JobType::Sp, JobType::Gsolv];

/// Remedy for a failed job-type, if the failure is classified as recoverable.
pub fn remedy_for(job_type: JobType, error: &JobError) -> Option<Remedy> {
    if !RECOVERABLE_JOB_TYPES.contains(&job_type) {
        return None;
    }
    match error {
        JobError::ScfNotConverged => Some(Remedy::ScfNotConverged),
        _ => None,
    }
}

/// Jobs selected for retry and subjects left with terminal failures.
#[derive(Debug, Default)]
pub struct RetryPlan {
    pub retry: Vec<Job>,
    /// Subjects with failures that have no remedy.
    pub terminal: Vec<SubjectId>,
}

impl RetryPlan {
    pub fn is_empty(&self) -> bool {
        self.retry.is_empty() && self.terminal.is_empty()
    }
}

/// Inspect finished jobs and build the retry set.
///
/// Fully successful jobs are discarded. A job with at least one recoverable
/// failure is kept with only its recoverable job-types pending and a remedy
/// flag per job-type.
pub fn select_retries(jobs: Vec<Job>) -> RetryPlan {
    let mut plan = RetryPlan::default();

    for mut job in jobs {
        if !job.has_failures() {
            continue;
        }

        let remedies: Vec<(JobType, Remedy)> = job
            .failed_types()
            .into_iter()
            .filter_map(|jt| {
                let error = job.outcomes.get(&jt)?.error.as_ref()?;
                remedy_for(jt, error).map(|r| (jt, r))
            })
            .collect();

        if remedies.is_empty() {
            debug!(subject = %job.id, "No remedy for failed job; not retrying");
            plan.terminal.push(job.id);
            continue;
        }

        for (jt, remedy) in &remedies {
            job.flags.insert(*jt, *remedy);
        }
        job.job_types
            .retain(|jt| remedies.iter().any(|(r, _)| r == jt));
        debug!(
            subject = %job.id,
            job_types = ?job.job_types,
            "Job selected for retry"
        );
        plan.retry.push(job);
    }

    plan
}
