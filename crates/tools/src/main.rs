use anyhow::{Context, Result};
use clap::Parser;
use env_logger::{Builder, Env};
use gridbench::{AbortPolicy, BatchPlan, write_batch};
use log::warn;
use std::path::PathBuf;

mod plan;

use plan::PlanFile;

/// Generates a batch of connected obstacle maps as JSON files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML plan file; the reference batch is used when omitted
    #[arg(short, long)]
    plan: Option<PathBuf>,
    /// Directory the map files and manifest are written to
    #[arg(short, long, default_value = "maps")]
    output: PathBuf,
    /// Override the plan's base seed
    #[arg(long)]
    base_seed: Option<u64>,
    /// Override the per-map retry budget
    #[arg(long)]
    max_retries: Option<u32>,
    /// Stop the whole batch when a task runs out of retries
    #[arg(long)]
    fail_fast: bool,
}

fn main() -> Result<()> {
    Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut plan = match &args.plan {
        Some(path) => PlanFile::load(path)?.into_plan()?,
        None => BatchPlan::default(),
    };
    if let Some(base_seed) = args.base_seed {
        plan.base_seed = base_seed;
    }
    if let Some(max_retries) = args.max_retries {
        plan.max_retries = max_retries;
    }

    let policy = if args.fail_fast { AbortPolicy::FailFast } else { AbortPolicy::SkipTask };
    let manifest = write_batch(&plan, &args.output, policy)
        .with_context(|| format!("Batch generation into {} failed", args.output.display()))?;

    if !manifest.aborted_tasks.is_empty() {
        warn!("{} task(s) stopped early; see the manifest", manifest.aborted_tasks.len());
    }

    Ok(())
}
