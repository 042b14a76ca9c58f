use anyhow::{Context, Result};
use qmpar_core::config::load_dotenv;
use qmpar_core::ParallelConfig;
use tracing::debug;

use crate::cli::CliArgs;

/// Resolve the effective config.
/// Priority: command-line flags > `QMPAR_*` env vars > config file > defaults.
pub fn resolve(args: &CliArgs) -> Result<ParallelConfig> {
    load_dotenv();

    let mut config = match &args.config {
        Some(path) => {
            debug!(?path, "Loading config");
            ParallelConfig::load(path)
                .with_context(|| format!("failed to load config: {}", path.display()))?
        }
        None => {
            debug!("No config file given, using defaults");
            ParallelConfig::default()
        }
    };

    config
        .apply_env_overrides()
        .context("invalid QMPAR_* environment variable")?;
    apply_args(&mut config, args);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn apply_args(config: &mut ParallelConfig, args: &CliArgs) {
    if let Some(program) = &args.program {
        config.program = Some(program.clone());
    }
    if args.no_balance {
        config.balance = false;
    }
    if let Some(cores) = args.cores_per_job {
        config.cores_per_job = cores;
    }
    if let Some(cores) = args.max_cores {
        config.max_cores = cores;
    }
    if args.no_retry {
        config.retry_failed = false;
    }
    if args.propagate_guess {
        config.propagate_guess = true;
    }
}
