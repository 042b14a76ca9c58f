//! Chunk planner for balanced mode.
//!
//! Jobs of roughly equal runtime are split into chunks. Every job in a chunk
//! gets `total_cores / proc_count` cores, where `proc_count` is the number of
//! jobs the chunk runs side by side. `proc_count` stays within
//! `[total / omp_max, total / omp_min]` and divides the budget evenly whenever
//! such a divisor is available, so no cores are lost to rounding.
//!
//! The greedy walk maximizes concurrency per phase. The last phases may be
//! shorter than the first ones; that unevenness is accepted.

use qmpar_core::Job;
use serde::Serialize;

/// Admissible range of concurrently running jobs for one budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcBounds {
    pub min_procs: usize,
    pub max_procs: usize,
}

impl ProcBounds {
    pub fn new(total_cores: usize, omp_min: usize, omp_max: usize) -> Self {
        let max_procs = (total_cores / omp_min.max(1)).max(1);
        let min_procs = (total_cores / omp_max.max(1)).max(1).min(max_procs);
        Self {
            min_procs,
            max_procs,
        }
    }
}

/// Pick how many jobs run side by side when `remaining` jobs are left.
pub fn procs_for_remaining(
    remaining: usize,
    total_cores: usize,
    omp_min: usize,
    omp_max: usize,
) -> usize {
    let bounds = ProcBounds::new(total_cores, omp_min, omp_max);
    if remaining < bounds.min_procs {
        return bounds.min_procs;
    }

    // When remaining >= max_procs this is max_procs itself if it divides the budget.
    let upper = remaining.min(bounds.max_procs);
    (bounds.min_procs..=upper)
        .rev()
        .find(|p| total_cores % p == 0)
        .unwrap_or(upper)
}

/// Shape of one planned chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkSpec {
    /// Jobs run concurrently within the chunk.
    pub proc_count: usize,
    /// Cores per job.
    pub cost: usize,
    /// Number of jobs assigned to the chunk.
    pub len: usize,
}

/// Plan chunks for `job_count` jobs. Consecutive steps with the same
/// `proc_count` are merged into one chunk.
pub fn plan_chunks(
    job_count: usize,
    total_cores: usize,
    omp_min: usize,
    omp_max: usize,
) -> Vec<ChunkSpec> {
    let mut chunks: Vec<ChunkSpec> = Vec::new();
    let mut remaining = job_count;

    while remaining > 0 {
        let p = procs_for_remaining(remaining, total_cores, omp_min, omp_max);
        // Fewer than p jobs left: the final chunk runs them all at the chunk's cost.
        let take = p.min(remaining);

        match chunks.last_mut() {
            Some(last) if last.proc_count == p => last.len += take,
            _ => chunks.push(ChunkSpec {
                proc_count: p,
                cost: total_cores / p,
                len: take,
            }),
        }
        remaining -= take;
    }

    chunks
}

/// A group of jobs sharing one per-job core cost.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub proc_count: usize,
    pub cost: usize,
    pub jobs: Vec<Job>,
}

/// Partition `jobs` into chunks and set each job's cost.
pub fn chunk_jobs(
    jobs: Vec<Job>,
    total_cores: usize,
    omp_min: usize,
    omp_max: usize,
) -> Vec<Chunk> {
    let layout = plan_chunks(jobs.len(), total_cores, omp_min, omp_max);
    let mut jobs = jobs.into_iter();

    layout
        .into_iter()
        .map(|shape| Chunk {
            proc_count: shape.proc_count,
            cost: shape.cost,
            jobs: jobs
                .by_ref()
                .take(shape.len)
                .map(|mut job| {
                    job.cost = shape.cost;
                    job
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexSet;
    use qmpar_core::{JobType, SubjectId};

    #[test]
    fn bounds_for_sixteen_cores() {
        let b = ProcBounds::new(16, 4, 8);
        assert_eq!(b.max_procs, 4);
        assert_eq!(b.min_procs, 2);
    }

    #[test]
    fn bounds_never_zero() {
        let b = ProcBounds::new(2, 4, 32);
        assert_eq!(b.max_procs, 1);
        assert_eq!(b.min_procs, 1);
    }

    #[test]
    fn full_load_uses_max_procs() {
        assert_eq!(procs_for_remaining(100, 16, 4, 8), 4);
        assert_eq!(procs_for_remaining(4, 16, 4, 8), 4);
    }

    #[test]
    fn partial_load_picks_largest_divisor() {
        // 24 cores, 3..=6 procs; 5 jobs left -> 4 divides 24
        assert_eq!(procs_for_remaining(5, 24, 4, 8), 4);
        assert_eq!(procs_for_remaining(3, 24, 4, 8), 3);
    }

    #[test]
    fn below_min_procs_uses_min_procs() {
        assert_eq!(procs_for_remaining(1, 16, 4, 8), 2);
    }

    #[test]
    fn max_procs_not_dividing_budget_prefers_divisor() {
        // 14 cores, omp 4..8 -> procs 1..=3; 3 does not divide 14
        assert_eq!(procs_for_remaining(10, 14, 4, 8), 2);
    }

    #[test]
    fn scenario_sixteen_cores_ten_jobs() {
        let chunks = plan_chunks(10, 16, 4, 8);
        assert_eq!(
            chunks,
            vec![
                ChunkSpec { proc_count: 4, cost: 4, len: 8 },
                ChunkSpec { proc_count: 2, cost: 8, len: 2 },
            ]
        );
        for c in &chunks {
            assert_eq!(c.cost, 16 / c.proc_count);
        }
    }

    #[test]
    fn remainder_below_min_procs_is_assigned() {
        // 16 cores, omp 4..8 -> min 2; 9 jobs leaves a single straggler
        let chunks = plan_chunks(9, 16, 4, 8);
        assert_eq!(chunks.iter().map(|c| c.len).sum::<usize>(), 9);
        let last = chunks.last().unwrap();
        assert_eq!(last.proc_count, 2);
        assert_eq!(last.len, 1);
        assert_eq!(last.cost, 8);
    }

    #[test]
    fn empty_job_list_has_no_chunks() {
        assert!(plan_chunks(0, 16, 4, 8).is_empty());
    }

    #[test]
    fn chunks_cover_jobs_and_divide_budget() {
        for total in 1..=64 {
            for (omp_min, omp_max) in [(1, 4), (2, 8), (4, 8), (4, 32), (3, 5)] {
                let bounds = ProcBounds::new(total, omp_min, omp_max);
                for n in 1..=40 {
                    let chunks = plan_chunks(n, total, omp_min, omp_max);
                    assert_eq!(chunks.iter().map(|c| c.len).sum::<usize>(), n);

                    let mut remaining = n;
                    for c in &chunks {
                        assert!(c.cost >= 1);
                        assert!(c.cost * c.proc_count <= total);
                        let divisor_available = remaining >= bounds.min_procs
                            && (bounds.min_procs..=remaining.min(bounds.max_procs))
                                .any(|p| total % p == 0);
                        if divisor_available {
                            assert_eq!(
                                total % c.cost,
                                0,
                                "total={total} omp=({omp_min},{omp_max}) n={n} chunk={c:?}"
                            );
                        }
                        remaining -= c.len;
                    }
                }
            }
        }
    }

    #[test]
    fn chunk_jobs_assigns_costs_in_order() {
        let jobs: Vec<Job> = (0..10)
            .map(|_| Job::new(SubjectId::new(), IndexSet::from([JobType::Sp]), 1))
            .collect();
        let ids: Vec<SubjectId> = jobs.iter().map(|j| j.id).collect();

        let chunks = chunk_jobs(jobs, 16, 4, 8);
        let flat: Vec<&Job> = chunks.iter().flat_map(|c| c.jobs.iter()).collect();
        assert_eq!(flat.iter().map(|j| j.id).collect::<Vec<_>>(), ids);
        for chunk in &chunks {
            assert!(chunk.jobs.iter().all(|j| j.cost == chunk.cost));
        }
    }
}
