pub mod config;
pub mod error;
pub mod job;
pub mod result_set;
pub mod subject;

pub use config::{ParallelConfig, ProgramConfig, OMP_MAX, OMP_MIN};
pub use error::*;
pub use job::{Job, JobError, JobOutcome, JobType, Remedy};
pub use result_set::{ResultSet, SubjectResults};
pub use subject::{Subject, SubjectId};
