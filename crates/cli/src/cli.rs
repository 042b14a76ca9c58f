use std::path::PathBuf;

use clap::Parser;

/// Run quantum-chemistry jobs for an ensemble within a fixed core budget.
///
/// Each subject listed in the subjects file gets one job per configured
/// job-type. Results are written as JSON keyed by subject id.
#[derive(Parser, Debug)]
#[command(name = "qmpar", version, about)]
pub struct CliArgs {
    /// Path to a TOML config file
    #[arg(long, env = "QMPAR_CONFIG")]
    pub config: Option<PathBuf>,

    /// File with one subject per line: `<name> [guess_file]`
    #[arg(long)]
    pub subjects: PathBuf,

    /// Directory in which programs run (one subdirectory per subject)
    #[arg(long, default_value = "qmpar-work")]
    pub workdir: PathBuf,

    /// Program to run (overrides config)
    #[arg(long)]
    pub program: Option<String>,

    /// Use a constant number of cores per job instead of balanced chunks
    #[arg(long)]
    pub no_balance: bool,

    /// Cores per job when balancing is disabled
    #[arg(long)]
    pub cores_per_job: Option<usize>,

    /// Total core budget (default: all available cores)
    #[arg(long)]
    pub max_cores: Option<usize>,

    /// Do not retry recoverable failures
    #[arg(long)]
    pub no_retry: bool,

    /// Pass guess files from earlier runs to new jobs
    #[arg(long)]
    pub propagate_guess: bool,

    /// Write results here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}
