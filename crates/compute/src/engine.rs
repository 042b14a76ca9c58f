use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use qmpar_core::{Job, ParallelConfig, ResultSet, Subject, SubjectId};
use tracing::{info, warn};

use crate::scheduler::budget::CoreBudget;
use crate::scheduler::error::ScheduleError;
use crate::scheduler::metrics::SchedulerMetrics;
use crate::scheduler::planner::chunk_jobs;
use crate::scheduler::registry::RunnerRegistry;
use crate::scheduler::retry::select_retries;
use crate::scheduler::runner::Scheduler;
use crate::scheduler::types::{BatchOutput, RetrySummary};

/// Result of one [`ParallelEngine::execute`] call.
#[derive(Debug, Clone)]
pub struct Execution {
    pub results: ResultSet,
    pub summary: RetrySummary,
    pub metrics: SchedulerMetrics,
}

/// Runs the configured job-types for an ensemble of subjects: builds jobs,
/// assigns core costs, schedules them, retries recoverable failures once and
/// merges everything into one [`ResultSet`].
pub struct ParallelEngine {
    config: ParallelConfig,
    registry: RunnerRegistry,
    shutdown: Arc<AtomicBool>,
    metrics: Arc<RwLock<SchedulerMetrics>>,
}

impl ParallelEngine {
    pub fn new(config: ParallelConfig, registry: RunnerRegistry) -> Self {
        Self {
            config,
            registry,
            shutdown: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(RwLock::new(SchedulerMetrics::default())),
        }
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Flag that stops admission of further jobs when set.
    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Execute every configured job-type for every subject.
    ///
    /// With `propagate_guess`, each job starts from its subject's latest guess
    /// artifact and newly produced artifacts are appended to the subject.
    pub fn execute(&self, subjects: &mut [Subject]) -> Result<Execution, ScheduleError> {
        let start = Instant::now();
        self.config.validate()?;
        let program = self.config.program_name()?;
        let total_cores = self.config.resolved_max_cores();
        let scheduler = Scheduler::for_program(&self.registry, program, CoreBudget::new(total_cores))?
            .with_shutdown(Arc::clone(&self.shutdown))
            .with_metrics(Arc::clone(&self.metrics));

        let expected: Vec<SubjectId> = subjects.iter().map(|s| s.id).collect();
        let jobs: Vec<Job> = subjects
            .iter()
            .map(|subject| {
                let mut job = Job::new(
                    subject.id,
                    self.config.job_types.clone(),
                    self.config.cores_per_job,
                )
                .with_name(&subject.name);
                if self.config.propagate_guess {
                    job.guess_file = subject.latest_guess().cloned();
                }
                job
            })
            .collect();

        info!(
            subjects = subjects.len(),
            cores = total_cores,
            balance = self.config.balance,
            "Starting parallel execution"
        );

        let first = if self.config.balance {
            self.run_balanced(&scheduler, jobs, total_cores)?
        } else {
            self.run_constant(&scheduler, jobs)?
        };
        ensure_complete(&first.results, &expected)?;
        if self.config.propagate_guess {
            record_artifacts(subjects, &first.jobs);
        }

        let mut batches = vec![first.results];
        let mut retried = 0;

        if self.config.retry_failed {
            let plan = select_retries(first.jobs);
            if plan.is_empty() {
                info!("All jobs executed successfully.");
            } else {
                retried = plan.retry.len();
                info!(
                    retried,
                    unrecoverable = plan.terminal.len(),
                    "Restarting {} jobs.",
                    retried
                );

                let mut retry_jobs = plan.retry;
                if self.config.propagate_guess {
                    for job in &mut retry_jobs {
                        if let Some(artifact) = job.artifact_path.take() {
                            job.guess_file = Some(artifact);
                        }
                    }
                }

                let second = self.run_balanced(&scheduler, retry_jobs, total_cores)?;
                if self.config.propagate_guess {
                    record_artifacts(subjects, &second.jobs);
                }
                batches.push(second.results);
            }
        }

        let results = ResultSet::merge_all(batches);
        ensure_complete(&results, &expected)?;

        let summary = RetrySummary {
            retried,
            terminal_failed: results.terminal_failures().len(),
        };
        if let Ok(mut m) = self.metrics.write() {
            m.jobs_retried += retried as u64;
            m.terminal_failures += summary.terminal_failed as u64;
        }
        info!(
            retried = summary.retried,
            terminal_failed = summary.terminal_failed,
            "Parallel execution finished in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        Ok(Execution {
            results,
            summary,
            metrics: scheduler.metrics(),
        })
    }

    /// Chunk the jobs and run each chunk as its own phase.
    fn run_balanced(
        &self,
        scheduler: &Scheduler,
        jobs: Vec<Job>,
        total_cores: usize,
    ) -> Result<BatchOutput, ScheduleError> {
        let chunks = chunk_jobs(jobs, total_cores, self.config.omp_min, self.config.omp_max);
        info!(
            chunks = chunks.len(),
            plan = ?chunks.iter().map(|c| (c.jobs.len(), c.cost)).collect::<Vec<_>>(),
            "Planned balanced chunks (jobs, cores per job)"
        );

        let mut output = BatchOutput::default();
        for chunk in chunks {
            output.extend(scheduler.run_batch(chunk.jobs)?);
        }
        Ok(output)
    }

    fn run_constant(&self, scheduler: &Scheduler, jobs: Vec<Job>) -> Result<BatchOutput, ScheduleError> {
        if self.config.cores_per_job < self.config.omp_min {
            warn!(
                "cores_per_job ({}) is less than {}, the recommended value for efficient parallelization.",
                self.config.cores_per_job, self.config.omp_min
            );
        }
        scheduler.run_batch(jobs)
    }
}

/// Every input subject must have an entry; a missing one means a lost job.
fn ensure_complete(results: &ResultSet, expected: &[SubjectId]) -> Result<(), ScheduleError> {
    let missing = results.missing(expected);
    if missing.is_empty() {
        return Ok(());
    }
    let ids: Vec<String> = missing.iter().map(|id| id.to_string()).collect();
    Err(ScheduleError::Consistency(format!(
        "no results for {} subject(s): {}",
        ids.len(),
        ids.join(", ")
    )))
}

fn record_artifacts(subjects: &mut [Subject], jobs: &[Job]) {
    for job in jobs {
        let Some(artifact) = &job.artifact_path else {
            continue;
        };
        if let Some(subject) = subjects.iter_mut().find(|s| s.id == job.id) {
            subject.guess_files.push(artifact.clone());
        }
    }
}
