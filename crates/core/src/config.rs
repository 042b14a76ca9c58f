use std::env;
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::job::JobType;

/// Recommended lower bound of cores per job for efficient parallelization.
pub const OMP_MIN: usize = 4;
/// Upper bound of cores per job used by balanced mode.
pub const OMP_MAX: usize = 32;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// How to launch one external program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub executable: PathBuf,
    /// Arguments placed before the job-type argument.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Options controlling one parallel execution call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Program whose runner executes the jobs.
    #[serde(default)]
    pub program: Option<String>,
    /// Partition jobs with the chunk planner instead of a constant cost.
    #[serde(default = "default_balance")]
    pub balance: bool,
    /// Cores per job when `balance` is off.
    #[serde(default = "default_cores_per_job")]
    pub cores_per_job: usize,
    /// Carry guess artifacts forward to later jobs of the same subject.
    #[serde(default)]
    pub propagate_guess: bool,
    /// Retry classified-recoverable failures once.
    #[serde(default = "default_retry_failed")]
    pub retry_failed: bool,
    #[serde(default = "default_job_types")]
    pub job_types: IndexSet<JobType>,
    #[serde(default = "default_omp_min")]
    pub omp_min: usize,
    #[serde(default = "default_omp_max")]
    pub omp_max: usize,
    /// Total core budget. 0 = available parallelism of the host.
    #[serde(default)]
    pub max_cores: usize,
    #[serde(default)]
    pub programs: IndexMap<String, ProgramConfig>,
}

fn default_balance() -> bool { true }
fn default_cores_per_job() -> usize { OMP_MIN }
fn default_retry_failed() -> bool { true }
fn default_job_types() -> IndexSet<JobType> { IndexSet::from([JobType::Sp]) }
fn default_omp_min() -> usize { OMP_MIN }
fn default_omp_max() -> usize { OMP_MAX }

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            program: None,
            balance: default_balance(),
            cores_per_job: default_cores_per_job(),
            propagate_guess: false,
            retry_failed: default_retry_failed(),
            job_types: default_job_types(),
            omp_min: default_omp_min(),
            omp_max: default_omp_max(),
            max_cores: 0,
            programs: IndexMap::new(),
        }
    }
}

impl ParallelConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read and parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Override fields from `QMPAR_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(env_opt)
    }

    /// Override fields from an arbitrary key lookup.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("QMPAR_PROGRAM") {
            self.program = Some(v);
        }
        if let Some(v) = lookup("QMPAR_BALANCE") {
            self.balance = parse_bool("QMPAR_BALANCE", &v)?;
        }
        if let Some(v) = lookup("QMPAR_CORES_PER_JOB") {
            self.cores_per_job = parse_usize("QMPAR_CORES_PER_JOB", &v)?;
        }
        if let Some(v) = lookup("QMPAR_RETRY_FAILED") {
            self.retry_failed = parse_bool("QMPAR_RETRY_FAILED", &v)?;
        }
        if let Some(v) = lookup("QMPAR_PROPAGATE_GUESS") {
            self.propagate_guess = parse_bool("QMPAR_PROPAGATE_GUESS", &v)?;
        }
        if let Some(v) = lookup("QMPAR_MAX_CORES") {
            self.max_cores = parse_usize("QMPAR_MAX_CORES", &v)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.omp_min == 0 || self.omp_min > self.omp_max {
            return Err(ConfigError::InvalidOmpRange {
                min: self.omp_min,
                max: self.omp_max,
            });
        }
        if self.cores_per_job == 0 {
            return Err(ConfigError::InvalidValue {
                key: "cores_per_job".to_string(),
                value: "0".to_string(),
            });
        }
        if self.job_types.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "job_types".to_string(),
                value: "[]".to_string(),
            });
        }
        Ok(())
    }

    /// Program name, or [`ConfigError::ProgramUnset`].
    pub fn program_name(&self) -> Result<&str, ConfigError> {
        self.program.as_deref().ok_or(ConfigError::ProgramUnset)
    }

    /// Resolve the core budget (0 means use available parallelism).
    pub fn resolved_max_cores(&self) -> usize {
        if self.max_cores == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(OMP_MIN)
        } else {
            self.max_cores
        }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        let job_types: Vec<&str> = self.job_types.iter().map(|jt| jt.as_str()).collect();
        tracing::info!("Parallel config:");
        tracing::info!("  program:   {}", self.program.as_deref().unwrap_or("(unset)"));
        tracing::info!("  balance:   {} (omp_min={}, omp_max={})", self.balance, self.omp_min, self.omp_max);
        tracing::info!("  cores/job: {}", self.cores_per_job);
        tracing::info!("  max cores: {}", self.resolved_max_cores());
        tracing::info!("  retry:     {}, propagate guess: {}", self.retry_failed, self.propagate_guess);
        tracing::info!("  job types: {}", job_types.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ParallelConfig::default();
        assert!(config.balance);
        assert!(config.retry_failed);
        assert!(!config.propagate_guess);
        assert_eq!(config.cores_per_job, 4);
        assert_eq!(config.omp_min, OMP_MIN);
        assert_eq!(config.omp_max, OMP_MAX);
        assert_eq!(config.job_types.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_toml_with_programs() {
        let config = ParallelConfig::from_toml_str(
            r#"
            program = "orca"
            balance = false
            cores_per_job = 8
            job_types = ["sp", "xtb_rrho"]

            [programs.orca]
            executable = "/opt/orca/run.sh"
            args = ["--quiet"]
            "#,
        )
        .unwrap();

        assert_eq!(config.program_name().unwrap(), "orca");
        assert!(!config.balance);
        assert_eq!(config.cores_per_job, 8);
        assert_eq!(
            config.job_types.iter().copied().collect::<Vec<_>>(),
            vec![JobType::Sp, JobType::XtbRrho]
        );
        assert_eq!(config.programs["orca"].args, vec!["--quiet".to_string()]);
        // unset fields keep defaults
        assert!(config.retry_failed);
    }

    #[test]
    fn parse_rejects_unknown_job_type() {
        let err = ParallelConfig::from_toml_str(r#"job_types = ["freq"]"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_cores = 16\nomp_min = 2").unwrap();

        let config = ParallelConfig::load(file.path()).unwrap();
        assert_eq!(config.max_cores, 16);
        assert_eq!(config.resolved_max_cores(), 16);
        assert_eq!(config.omp_min, 2);
    }

    #[test]
    fn load_missing_file_is_read_error() {
        let err = ParallelConfig::load(Path::new("/nonexistent/qmpar.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn overrides_from_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("QMPAR_PROGRAM", "xtb"),
            ("QMPAR_BALANCE", "no"),
            ("QMPAR_MAX_CORES", "12"),
        ]);
        let mut config = ParallelConfig::default();
        config
            .apply_overrides(|k| vars.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.program.as_deref(), Some("xtb"));
        assert!(!config.balance);
        assert_eq!(config.max_cores, 12);
    }

    #[test]
    fn overrides_reject_garbage() {
        let mut config = ParallelConfig::default();
        let err = config
            .apply_overrides(|k| (k == "QMPAR_CORES_PER_JOB").then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn validate_rejects_bad_omp_range() {
        let config = ParallelConfig {
            omp_min: 16,
            omp_max: 8,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidOmpRange { min: 16, max: 8 })
        );
    }

    #[test]
    fn unset_program_is_config_error() {
        assert_eq!(
            ParallelConfig::default().program_name(),
            Err(ConfigError::ProgramUnset)
        );
    }
}
