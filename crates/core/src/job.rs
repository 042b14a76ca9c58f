use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::subject::SubjectId;

/// Kind of task executed for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    /// Single-point energy.
    Sp,
    /// Solvation correction.
    Gsolv,
    XtbGsolv,
    XtbRrho,
    Opt,
    XtbOpt,
    Nmr,
    Uvvis,
}

impl JobType {
    pub const ALL: [JobType; 8] = [
        JobType::Sp,
        JobType::Gsolv,
        JobType::XtbGsolv,
        JobType::XtbRrho,
        JobType::Opt,
        JobType::XtbOpt,
        JobType::Nmr,
        JobType::Uvvis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Sp => "sp",
            JobType::Gsolv => "gsolv",
            JobType::XtbGsolv => "xtb_gsolv",
            JobType::XtbRrho => "xtb_rrho",
            JobType::Opt => "opt",
            JobType::XtbOpt => "xtb_opt",
            JobType::Nmr => "nmr",
            JobType::Uvvis => "uvvis",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        JobType::ALL
            .iter()
            .copied()
            .find(|jt| jt.as_str() == needle)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: "job_type".to_string(),
                value: s.to_string(),
            })
    }
}

/// Classification of a failed job-type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobError {
    /// The SCF procedure did not converge.
    ScfNotConverged,
    /// The external program exited unsuccessfully.
    ProgramFailed { code: Option<i32> },
    /// The external program could not be started.
    Spawn { message: String },
    /// The runner returned without an outcome for this job-type.
    MissingOutcome,
    /// The runner panicked while executing the job.
    RunnerPanicked { message: String },
    Other { message: String },
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::ScfNotConverged => f.write_str("SCF not converged"),
            JobError::ProgramFailed { code: Some(code) } => {
                write!(f, "program exited with code {}", code)
            }
            JobError::ProgramFailed { code: None } => f.write_str("program terminated by signal"),
            JobError::Spawn { message } => write!(f, "failed to start program: {}", message),
            JobError::MissingOutcome => f.write_str("runner produced no outcome"),
            JobError::RunnerPanicked { message } => write!(f, "runner panicked: {}", message),
            JobError::Other { message } => f.write_str(message),
        }
    }
}

/// Corrective directive attached to a job-type before it is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remedy {
    /// Switch to a more robust SCF convergence strategy.
    ScfNotConverged,
}

impl Remedy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Remedy::ScfNotConverged => "scf_not_converged",
        }
    }
}

/// Result of one job-type for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub success: bool,
    pub error: Option<JobError>,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl JobOutcome {
    pub fn succeeded(value: serde_json::Value) -> Self {
        Self {
            success: true,
            error: None,
            value,
        }
    }

    pub fn failed(error: JobError) -> Self {
        Self {
            success: false,
            error: Some(error),
            value: serde_json::Value::Null,
        }
    }
}

/// One schedulable unit of work: a subject plus the job-types still to run for it.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: SubjectId,
    /// Human-readable subject name, empty when the job was built without one.
    pub name: String,
    /// Job-types still pending. Successful ones are removed before a retry.
    pub job_types: IndexSet<JobType>,
    /// Number of cores this job may use.
    pub cost: usize,
    pub guess_file: Option<PathBuf>,
    pub flags: HashMap<JobType, Remedy>,
    pub outcomes: IndexMap<JobType, JobOutcome>,
    /// Guess artifact produced by the last run, if any.
    pub artifact_path: Option<PathBuf>,
}

impl Job {
    pub fn new(id: SubjectId, job_types: IndexSet<JobType>, cost: usize) -> Self {
        Self {
            id,
            name: String::new(),
            job_types,
            cost,
            guess_file: None,
            flags: HashMap::new(),
            outcomes: IndexMap::new(),
            artifact_path: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Fold a runner's report into this job. Pending job-types the runner
    /// did not report on are recorded as [`JobError::MissingOutcome`].
    pub fn apply_outcomes(
        &mut self,
        mut outcomes: IndexMap<JobType, JobOutcome>,
        artifact_path: Option<PathBuf>,
    ) {
        for jt in &self.job_types {
            let outcome = outcomes
                .shift_remove(jt)
                .unwrap_or_else(|| JobOutcome::failed(JobError::MissingOutcome));
            self.outcomes.insert(*jt, outcome);
        }
        if artifact_path.is_some() {
            self.artifact_path = artifact_path;
        }
    }

    /// Mark every pending job-type as failed with the same error.
    pub fn fail_all(&mut self, error: JobError) {
        for jt in &self.job_types {
            self.outcomes.insert(*jt, JobOutcome::failed(error.clone()));
        }
    }

    pub fn succeeded(&self, job_type: JobType) -> bool {
        self.outcomes.get(&job_type).is_some_and(|o| o.success)
    }

    /// Pending job-types without a successful outcome.
    pub fn failed_types(&self) -> Vec<JobType> {
        self.job_types
            .iter()
            .copied()
            .filter(|jt| !self.succeeded(*jt))
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.job_types.iter().any(|jt| !self.succeeded(*jt))
    }

    /// Outcomes of the job-types that were pending for the last run.
    pub fn results(&self) -> IndexMap<JobType, JobOutcome> {
        self.job_types
            .iter()
            .filter_map(|jt| self.outcomes.get(jt).map(|o| (*jt, o.clone())))
            .collect()
    }
}
