//! Runner that launches an external program once per job-type.
//!
//! The program is started as `<executable> [args...] <job_type>` inside
//! `<workdir>/<subject_name>/` (or `<workdir>/<subject_id>/` when the name is
//! not a plain directory name), with the job's core count exported as
//! `OMP_NUM_THREADS`. Exit status 0 is success and stdout becomes the outcome
//! value (parsed as JSON when possible). A `<job_type>.guess` file left in the
//! subject directory is reported as the guess artifact.

use std::path::{Component, Path, PathBuf};
use std::process::{Command, Output};

use qmpar_core::{Job, JobError, JobOutcome, JobType, ProgramConfig};
use tracing::{debug, warn};

use crate::scheduler::task::{RunReport, Runner};

const SCF_NOT_CONVERGED: &str = "SCF not converged";

/// Runs jobs through an external executable.
pub struct CommandRunner {
    program: String,
    config: ProgramConfig,
    workdir: PathBuf,
}

impl CommandRunner {
    pub fn new(program: impl Into<String>, config: ProgramConfig, workdir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            config,
            workdir: workdir.into(),
        }
    }

    fn subject_dir(&self, job: &Job) -> PathBuf {
        let mut components = Path::new(&job.name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => self.workdir.join(name),
            _ => self.workdir.join(job.id.to_string()),
        }
    }

    fn run_one(&self, job: &Job, job_type: JobType, dir: &Path) -> JobOutcome {
        let cores = job.cost.to_string();
        let mut cmd = Command::new(&self.config.executable);
        cmd.args(&self.config.args)
            .arg(job_type.as_str())
            .current_dir(dir)
            .env("OMP_NUM_THREADS", &cores)
            .env("QMPAR_CORES", &cores)
            .env("QMPAR_SUBJECT", job.id.to_string())
            .env("QMPAR_SUBJECT_NAME", &job.name)
            .env("QMPAR_JOB_TYPE", job_type.as_str());
        if let Some(guess) = &job.guess_file {
            cmd.env("QMPAR_GUESS", guess);
        }
        if let Some(remedy) = job.flags.get(&job_type) {
            cmd.env("QMPAR_REMEDY", remedy.as_str());
        }

        debug!(
            program = %self.program,
            subject = %job.id,
            job_type = %job_type,
            cores = job.cost,
            "Starting external program"
        );

        match cmd.output() {
            Ok(output) => classify(output),
            Err(e) => {
                warn!(program = %self.program, error = %e, "Failed to start program");
                JobOutcome::failed(JobError::Spawn {
                    message: e.to_string(),
                })
            }
        }
    }
}

fn classify(output: Output) -> JobOutcome {
    let stdout = String::from_utf8_lossy(&output.stdout);
    if output.status.success() {
        let value = serde_json::from_str(stdout.trim())
            .unwrap_or_else(|_| serde_json::Value::String(stdout.trim().to_string()));
        return JobOutcome::succeeded(value);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stdout.contains(SCF_NOT_CONVERGED) || stderr.contains(SCF_NOT_CONVERGED) {
        JobOutcome::failed(JobError::ScfNotConverged)
    } else {
        JobOutcome::failed(JobError::ProgramFailed {
            code: output.status.code(),
        })
    }
}

impl Runner for CommandRunner {
    fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, job: &Job) -> RunReport {
        let dir = self.subject_dir(job);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            return RunReport::all_failed(
                job,
                JobError::Other {
                    message: format!("cannot create {}: {}", dir.display(), e),
                },
            );
        }

        let mut report = RunReport::new();
        for job_type in &job.job_types {
            let outcome = self.run_one(job, *job_type, &dir);
            let guess = dir.join(format!("{}.guess", job_type));
            if outcome.success && guess.is_file() {
                report = report.with_artifact(guess);
            }
            report = report.with_outcome(*job_type, outcome);
        }
        report
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use indexmap::IndexSet;
    use qmpar_core::{Remedy, SubjectId};

    const SCRIPT: &str = r#"
case "$1" in
  sp)
    touch sp.guess
    echo "{\"energy\": -1.5, \"cores\": $OMP_NUM_THREADS}"
    ;;
  gsolv)
    if [ "$QMPAR_REMEDY" = "scf_not_converged" ]; then
      echo '{"gsolv": -0.004}'
    else
      echo "SCF not converged" >&2
      exit 1
    fi
    ;;
  nmr)
    echo "shielding done"
    ;;
  opt)
    echo "{\"name\": \"$QMPAR_SUBJECT_NAME\", \"dir\": \"$(basename "$(pwd -P)")\"}"
    ;;
  *)
    exit 3
    ;;
esac
"#;

    fn runner(workdir: &Path) -> CommandRunner {
        CommandRunner::new(
            "sh-test",
            ProgramConfig {
                executable: PathBuf::from("/bin/sh"),
                args: vec!["-c".to_string(), SCRIPT.to_string(), "qmpar-test".to_string()],
            },
            workdir,
        )
    }

    fn job(types: &[JobType]) -> Job {
        Job::new(SubjectId::new(), types.iter().copied().collect::<IndexSet<_>>(), 6)
    }

    #[test]
    fn success_parses_json_and_reports_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(&[JobType::Sp]);

        let report = runner(dir.path()).run(&job);

        let outcome = &report.outcomes[&JobType::Sp];
        assert!(outcome.success);
        assert_eq!(outcome.value["energy"], serde_json::json!(-1.5));
        assert_eq!(outcome.value["cores"], serde_json::json!(6));
        assert_eq!(
            report.artifact_path,
            Some(dir.path().join(job.id.to_string()).join("sp.guess"))
        );
    }

    #[test]
    fn non_json_stdout_is_kept_as_string() {
        let dir = tempfile::tempdir().unwrap();
        let report = runner(dir.path()).run(&job(&[JobType::Nmr]));
        assert_eq!(
            report.outcomes[&JobType::Nmr].value,
            serde_json::json!("shielding done")
        );
    }

    #[test]
    fn failures_are_classified() {
        let dir = tempfile::tempdir().unwrap();
        let report = runner(dir.path()).run(&job(&[JobType::Gsolv, JobType::XtbRrho]));

        assert_eq!(
            report.outcomes[&JobType::Gsolv].error,
            Some(JobError::ScfNotConverged)
        );
        assert_eq!(
            report.outcomes[&JobType::XtbRrho].error,
            Some(JobError::ProgramFailed { code: Some(3) })
        );
        assert!(report.artifact_path.is_none());
    }

    #[test]
    fn remedy_flag_is_passed_to_program() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = job(&[JobType::Gsolv]);
        job.flags.insert(JobType::Gsolv, Remedy::ScfNotConverged);

        let report = runner(dir.path()).run(&job);
        assert!(report.outcomes[&JobType::Gsolv].success);
    }

    #[test]
    fn named_subject_gets_own_directory_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(&[JobType::Opt]).with_name("CONF3");

        let report = runner(dir.path()).run(&job);

        let outcome = &report.outcomes[&JobType::Opt];
        assert!(outcome.success);
        assert_eq!(outcome.value["name"], serde_json::json!("CONF3"));
        assert_eq!(outcome.value["dir"], serde_json::json!("CONF3"));
        assert!(dir.path().join("CONF3").is_dir());
    }

    #[test]
    fn path_like_name_falls_back_to_subject_id() {
        let dir = tempfile::tempdir().unwrap();
        let job = job(&[JobType::Sp]).with_name("../escape");

        let report = runner(dir.path()).run(&job);

        assert_eq!(
            report.artifact_path,
            Some(dir.path().join(job.id.to_string()).join("sp.guess"))
        );
    }

    #[test]
    fn missing_executable_is_spawn_failure() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(
            "ghost",
            ProgramConfig {
                executable: PathBuf::from("/nonexistent/qm-program"),
                args: Vec::new(),
            },
            dir.path(),
        );

        let report = runner.run(&job(&[JobType::Sp]));
        assert!(matches!(
            report.outcomes[&JobType::Sp].error,
            Some(JobError::Spawn { .. })
        ));
    }
}
