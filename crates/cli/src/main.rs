mod cli;
mod config;
mod output;
mod subjects;

use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use qmpar_compute::{ParallelEngine, RunnerRegistry};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = config::resolve(&args)?;
    config.log_summary();

    let mut subjects = subjects::load(&args.subjects)?;
    info!(subjects = subjects.len(), path = %args.subjects.display(), "Loaded subjects");

    std::fs::create_dir_all(&args.workdir)
        .with_context(|| format!("failed to create workdir: {}", args.workdir.display()))?;
    let registry = RunnerRegistry::from_config(&config, &args.workdir)
        .context("failed to register programs")?;
    let engine = ParallelEngine::new(config, registry);

    // Ctrl-C stops admission; running programs are not waited for.
    let shutdown = engine.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping job admission");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    let (execution, subjects) = tokio::task::spawn_blocking(move || {
        engine.execute(&mut subjects).map(|execution| (execution, subjects))
    })
    .await
    .context("scheduler task failed")??;

    let report = output::by_subject_name(&subjects, &execution.results)?;
    let json = output::to_pretty(&report)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write results: {}", path.display()))?;
            info!(path = %path.display(), "Results written");
        }
        None => println!("{}", json),
    }

    info!(
        subjects = execution.results.len(),
        retried = execution.summary.retried,
        terminal_failed = execution.summary.terminal_failed,
        peak_cores = execution.metrics.peak_cores_in_use,
        "Done"
    );
    Ok(())
}
