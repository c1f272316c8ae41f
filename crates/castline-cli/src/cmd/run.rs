//! `castline run` - process new feed items once

use anyhow::Result;
use clap::Args;

use castline_core::{ProgressContext, Shutdown};
use castline_pipeline::{Coordinator, Mode, RunSummary, Scheduler};

use super::RuntimeArgs;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub runtime: RuntimeArgs,
}

pub fn run(
    args: RunArgs,
    config: &Config,
    progress: &ProgressContext,
    shutdown: &Shutdown,
) -> Result<u8> {
    let runtime = config.to_runtime(&args.runtime.overrides());
    let collaborators = config.collaborators()?;

    let report = Scheduler::new(Mode::Once, shutdown.clone())
        .run(|| Coordinator::new(&runtime, &collaborators, shutdown, progress).run_once());

    if let Some(Ok(summary)) = &report.last {
        if progress.is_tty() {
            eprintln!("\n{}", summary_table(summary));
        }
    }
    Ok(super::exit_code(report.last.as_ref()))
}

fn summary_table(summary: &RunSummary) -> comfy_table::Table {
    let mut table = super::table(&["Run", "Count"]);
    table.add_row(vec![
        "Feeds polled",
        &format!("{} ({} unavailable)", summary.feeds, summary.feeds_unavailable),
    ]);
    table.add_row(vec!["Items discovered", &summary.discovered.to_string()]);
    table.add_row(vec!["Succeeded", &summary.succeeded.to_string()]);
    table.add_row(vec![
        "Failed",
        &format!("{} ({} timed out)", summary.failed, summary.timed_out),
    ]);
    if summary.skipped > 0 {
        table.add_row(vec!["Skipped (shutdown)", &summary.skipped.to_string()]);
    }
    table.add_row(vec![
        "Elapsed",
        &format!("{:.1}s", summary.elapsed.as_secs_f64()),
    ]);
    table
}
