mod cli;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;

use tilefw_compute::{Harness, HarnessConfig, TaskEngine};
use tilefw_core::config::load_dotenv;
use tilefw_core::BenchConfig;

use crate::cli::CliArgs;

fn main() -> Result<()> {
    // Before the subscriber, so RUST_LOG may come from .env.
    load_dotenv();

    // Logs go to stderr; stdout carries only report lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = args.resolve(BenchConfig::from_env());
    config.log_summary();

    let kinds = args.selected().map_err(|e| anyhow!(e))?;
    let n = args.command.size();
    let params = args.command.params();

    let engine = TaskEngine::new(config.resolved_threads())
        .context("failed to start worker threads")?;
    let mut harness = Harness::new(&engine, HarnessConfig::from(&config));
    let input = harness
        .input(n)
        .with_context(|| format!("failed to generate {}x{} input matrix", n, n))?;

    info!(
        family = ?args.command.family(),
        n,
        strategies = kinds.len(),
        "Starting benchmark"
    );

    for kind in kinds {
        let report = harness
            .run(kind, &input, &params)
            .with_context(|| format!("strategy {} failed", kind))?;
        let line = report
            .render(config.format)
            .context("failed to render report")?;
        println!("{}", line);
    }

    Ok(())
}
