use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use qmpar_core::JobType;
use serde::Serialize;

/// Scheduler operational metrics, accumulated across batches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    /// Jobs handed to a worker.
    pub jobs_dispatched: u64,
    /// Executions per job-type.
    pub executions: HashMap<JobType, u64>,
    /// Failed executions per job-type.
    pub failures: HashMap<JobType, u64>,
    /// Mean wall time of whole jobs that included each job-type. A runner
    /// executes all of a job's types in one call, so this is not a per-type time.
    pub avg_job_duration: HashMap<JobType, Duration>,
    /// Highest number of cores held by running jobs at once.
    pub peak_cores_in_use: usize,
    /// Jobs resubmitted by the retry pass.
    pub jobs_retried: u64,
    /// Subjects left with failed job-types after retry resolution.
    pub terminal_failures: u64,
    /// Completion time of the last job.
    pub last_completion: Option<DateTime<Utc>>,
}

impl SchedulerMetrics {
    /// Record `job_type` as executed by a job that took `duration` overall.
    pub fn record_job(&mut self, job_type: JobType, duration: Duration, success: bool) {
        *self.executions.entry(job_type).or_default() += 1;
        if !success {
            *self.failures.entry(job_type).or_default() += 1;
        }
        self.last_completion = Some(Utc::now());

        let count = self.executions[&job_type];
        let prev_avg = self
            .avg_job_duration
            .get(&job_type)
            .copied()
            .unwrap_or_default();

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        let new_avg = if count == 1 {
            duration
        } else {
            let prev_nanos = prev_avg.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };

        self.avg_job_duration.insert(job_type, new_avg);
    }

    pub fn record_peak(&mut self, cores: usize) {
        self.peak_cores_in_use = self.peak_cores_in_use.max(cores);
    }
}
