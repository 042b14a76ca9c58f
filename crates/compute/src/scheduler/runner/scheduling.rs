use std::collections::HashSet;

use qmpar_core::{ConfigError, Job};

use crate::scheduler::error::ScheduleError;

use super::Scheduler;

impl Scheduler {
    /// Validate a batch and return it in admission order (ascending cost).
    ///
    /// A job that can never fit the budget is a configuration error raised
    /// here, before anything is dispatched, rather than a hang at admission.
    pub(crate) fn admission_order(&self, mut jobs: Vec<Job>) -> Result<Vec<Job>, ScheduleError> {
        let total = self.budget.total();
        let mut seen = HashSet::with_capacity(jobs.len());

        for job in &jobs {
            if job.job_types.is_empty() {
                return Err(ConfigError::EmptyJobTypes(job.id.to_string()).into());
            }
            if job.cost == 0 {
                return Err(ConfigError::ZeroCost(job.id.to_string()).into());
            }
            if job.cost > total {
                return Err(ConfigError::CostExceedsBudget {
                    subject: job.id.to_string(),
                    cost: job.cost,
                    budget: total,
                }
                .into());
            }
            if !seen.insert(job.id) {
                return Err(ScheduleError::Consistency(format!(
                    "subject {} appears twice in one batch",
                    job.id
                )));
            }
        }

        // Stable, so equal-cost jobs keep their input order.
        jobs.sort_by_key(|job| job.cost);
        Ok(jobs)
    }

    /// Worker count: the most jobs that can ever hold cores at once.
    pub(crate) fn pool_size(&self, jobs: &[Job]) -> usize {
        let min_cost = jobs.iter().map(|j| j.cost).min().unwrap_or(1).max(1);
        (self.budget.total() / min_cost).clamp(1, jobs.len().max(1))
    }
}
