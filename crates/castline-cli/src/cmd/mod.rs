//! Subcommand implementations

use std::path::PathBuf;

use castline_pipeline::{RunError, RunSummary};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use crate::config::Overrides;

pub mod run;
pub mod schedule;
pub mod status;

/// Exit code for a run that was aborted, or a configuration error
pub const ABORTED: u8 = 2;

/// Settings shared by `run` and `schedule` that override the config file
#[derive(Args, Debug, Default)]
pub struct RuntimeArgs {
    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output directory for audio artifacts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// State file path
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}

impl RuntimeArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            workers: self.workers,
            output: self.output.clone(),
            state_file: self.state_file.clone(),
        }
    }
}

/// Table with the CLI's house style
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            headers
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

/// Process exit code for the outcome of the last run.
pub fn exit_code(outcome: Option<&Result<RunSummary, RunError>>) -> u8 {
    match outcome {
        Some(Ok(summary)) => summary.exit_code(),
        Some(Err(e)) => e.exit_code(),
        None => 0,
    }
}
