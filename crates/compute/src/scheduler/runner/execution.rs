use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::{mpsc, Arc};
use std::time::Instant;

use qmpar_core::{Job, JobError};
use tracing::{debug, error, info, warn};

use crate::scheduler::error::ScheduleError;
use crate::scheduler::types::BatchOutput;

use super::Scheduler;

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Scheduler {
    /// Run every job of the batch exactly once and block until all finish.
    ///
    /// Jobs are admitted cheapest first. Admission blocks the calling thread
    /// until the job's cores are free; the cores return to the budget as soon
    /// as that job finishes. Completion order is unspecified.
    pub fn run_batch(&self, jobs: Vec<Job>) -> Result<BatchOutput, ScheduleError> {
        if jobs.is_empty() {
            return Ok(BatchOutput::default());
        }

        let jobs = self.admission_order(jobs)?;
        let submitted = jobs.len();
        let workers = self.pool_size(&jobs);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("qmpar-worker-{}", i))
            .build()
            .map_err(|e| ScheduleError::PoolBuild(e.to_string()))?;

        info!(
            program = self.runner.program(),
            jobs = submitted,
            workers,
            budget = self.budget.total(),
            "Dispatching batch"
        );

        let (tx, rx) = mpsc::channel::<Job>();

        for (dispatched, job) in jobs.into_iter().enumerate() {
            if self.shutdown.load(Ordering::Relaxed) {
                // Dropping the pool does not wait for in-flight jobs.
                warn!(dispatched, pending = submitted - dispatched, "Shutdown during dispatch");
                return Err(ScheduleError::Shutdown {
                    pending: submitted - dispatched,
                });
            }

            let lease = self.budget.acquire(job.cost)?;
            debug!(subject = %job.id, cores = job.cost, free = self.budget.free(), "Job admitted");

            let runner = Arc::clone(&self.runner);
            let metrics = Arc::clone(&self.metrics);
            let active_jobs = Arc::clone(&self.active_jobs);
            let tx = tx.clone();

            pool.spawn(move || {
                let mut job = job;
                active_jobs.fetch_add(1, Ordering::Relaxed);

                let start = Instant::now();
                let report = panic::catch_unwind(AssertUnwindSafe(|| runner.run(&job)));
                let duration = start.elapsed();

                drop(lease);
                active_jobs.fetch_sub(1, Ordering::Relaxed);

                match report {
                    Ok(report) => job.apply_outcomes(report.outcomes, report.artifact_path),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!(subject = %job.id, %message, "Runner panicked");
                        job.fail_all(JobError::RunnerPanicked { message });
                    }
                }

                if let Ok(mut m) = metrics.write() {
                    for (jt, outcome) in job.results() {
                        m.record_job(jt, duration, outcome.success);
                    }
                }
                debug!(
                    subject = %job.id,
                    cores = job.cost,
                    failed = job.has_failures(),
                    "Job finished in {:.1}s",
                    duration.as_secs_f64()
                );

                if tx.send(job).is_err() {
                    warn!("Batch receiver dropped; discarding job result");
                }
            });

            if let Ok(mut m) = self.metrics.write() {
                m.jobs_dispatched += 1;
            }
        }
        drop(tx);

        // Ends once every worker has sent its job and dropped its sender.
        let finished: Vec<Job> = rx.iter().collect();

        if let Ok(mut m) = self.metrics.write() {
            m.record_peak(self.budget.peak_in_use());
        }

        if finished.len() != submitted {
            return Err(ScheduleError::Consistency(format!(
                "{} of {} dispatched jobs did not report back",
                submitted - finished.len(),
                submitted
            )));
        }

        let failed = finished.iter().filter(|j| j.has_failures()).count();
        info!(jobs = submitted, failed, "Batch complete");

        Ok(BatchOutput::from_jobs(finished))
    }
}
