//! `castline schedule` - run now, then on a fixed interval until signalled

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use castline_core::{ProgressContext, Shutdown};
use castline_pipeline::{Coordinator, Mode, Scheduler};

use super::RuntimeArgs;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    /// Minutes between run starts (default: schedule.every_minutes)
    #[arg(long)]
    pub every_minutes: Option<u64>,
}

pub fn run(
    args: ScheduleArgs,
    config: &Config,
    progress: &ProgressContext,
    shutdown: &Shutdown,
) -> Result<u8> {
    let runtime = config.to_runtime(&args.runtime.overrides());
    let collaborators = config.collaborators()?;
    let interval = interval(args.every_minutes.unwrap_or(config.schedule.every_minutes));

    log::info!(
        "Scheduling runs over {} feeds every {}s",
        runtime.feeds.len(),
        interval.as_secs()
    );
    let report = Scheduler::new(Mode::Every(interval), shutdown.clone())
        .run(|| Coordinator::new(&runtime, &collaborators, shutdown, progress).run_once());

    log::info!(
        "Shut down after {} runs ({} aborted)",
        report.runs,
        report.failed_runs
    );
    Ok(0)
}

/// At least one minute apart
fn interval(minutes: u64) -> Duration {
    Duration::from_secs(minutes.max(1) * 60)
}
