//! Counting resource for the global core budget.
//!
//! A [`CoreBudget`] hands out [`CoreLease`]s. Acquisition blocks until enough
//! cores are free; the lease gives its cores back when dropped, so release
//! happens exactly once on every exit path, including unwinding workers.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::scheduler::error::ScheduleError;

#[derive(Debug)]
struct BudgetState {
    free: usize,
    in_use: usize,
    peak_in_use: usize,
}

#[derive(Debug)]
struct Inner {
    total: usize,
    state: Mutex<BudgetState>,
    released: Condvar,
}

/// Shared, cloneable handle to a fixed pool of cores.
#[derive(Debug, Clone)]
pub struct CoreBudget {
    inner: Arc<Inner>,
}

impl CoreBudget {
    pub fn new(total: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                total,
                state: Mutex::new(BudgetState {
                    free: total,
                    in_use: 0,
                    peak_in_use: 0,
                }),
                released: Condvar::new(),
            }),
        }
    }

    pub fn total(&self) -> usize {
        self.inner.total
    }

    pub fn free(&self) -> usize {
        self.lock().free
    }

    /// Highest number of cores held at once since creation.
    pub fn peak_in_use(&self) -> usize {
        self.lock().peak_in_use
    }

    /// Block until `cores` are free, then reserve them.
    ///
    /// Requests larger than the whole budget can never be satisfied and fail
    /// immediately instead of waiting forever.
    pub fn acquire(&self, cores: usize) -> Result<CoreLease, ScheduleError> {
        if cores > self.inner.total {
            return Err(ScheduleError::BudgetExceeded {
                requested: cores,
                total: self.inner.total,
            });
        }

        let mut state = self.lock();
        while state.free < cores {
            state = self
                .inner
                .released
                .wait(state)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
        state.free -= cores;
        state.in_use += cores;
        state.peak_in_use = state.peak_in_use.max(state.in_use);

        Ok(CoreLease {
            budget: self.clone(),
            cores,
        })
    }

    fn release(&self, cores: usize) {
        let mut state = self.lock();
        state.free += cores;
        state.in_use -= cores;
        drop(state);
        self.inner.released.notify_all();
    }

    // The counters stay consistent even if a holder panicked, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, BudgetState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cores reserved from a [`CoreBudget`]. Released on drop.
#[derive(Debug)]
pub struct CoreLease {
    budget: CoreBudget,
    cores: usize,
}

impl CoreLease {
    pub fn cores(&self) -> usize {
        self.cores
    }
}

impl Drop for CoreLease {
    fn drop(&mut self) {
        self.budget.release(self.cores);
    }
}
