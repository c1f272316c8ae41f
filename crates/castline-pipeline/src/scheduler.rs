//! Single-shot and fixed-interval invocation of runs

use std::time::{Duration, Instant};

use castline_core::Shutdown;

use crate::error::RunError;
use crate::runner::RunSummary;

/// How often to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Once,
    Every(Duration),
}

/// What a scheduler did before it returned.
#[derive(Debug)]
pub struct ScheduleReport {
    pub runs: usize,
    pub failed_runs: usize,
    /// Ticks dropped because a run outlasted the interval
    pub skipped_ticks: u64,
    /// Outcome of the most recent run
    pub last: Option<Result<RunSummary, RunError>>,
}

impl ScheduleReport {
    fn new() -> Self {
        Self {
            runs: 0,
            failed_runs: 0,
            skipped_ticks: 0,
            last: None,
        }
    }

    fn record(&mut self, outcome: Result<RunSummary, RunError>) {
        self.runs += 1;
        if let Err(e) = &outcome {
            self.failed_runs += 1;
            log::error!("run aborted: {e}");
        }
        self.last = Some(outcome);
    }
}

/// Invokes a run once, or on a fixed interval until shutdown.
#[derive(Debug)]
pub struct Scheduler {
    mode: Mode,
    shutdown: Shutdown,
}

impl Scheduler {
    pub fn new(mode: Mode, shutdown: Shutdown) -> Self {
        Self { mode, shutdown }
    }

    pub fn run<F>(&self, mut run: F) -> ScheduleReport
    where
        F: FnMut() -> Result<RunSummary, RunError>,
    {
        match self.mode {
            Mode::Once => {
                let mut report = ScheduleReport::new();
                report.record(run());
                report
            }
            Mode::Every(interval) => run_periodic(interval, &self.shutdown, run),
        }
    }
}

/// Run immediately, then once per `interval` until `shutdown` is requested.
///
/// Runs never overlap: a tick that passes while a run is still going is
/// dropped rather than queued. An aborted run is logged and the schedule
/// continues.
pub fn run_periodic<F>(interval: Duration, shutdown: &Shutdown, mut run: F) -> ScheduleReport
where
    F: FnMut() -> Result<RunSummary, RunError>,
{
    let interval = interval.max(Duration::from_millis(1));
    let mut report = ScheduleReport::new();
    let mut next_tick = Instant::now();

    while !shutdown.is_requested() {
        report.record(run());

        next_tick += interval;
        let now = Instant::now();
        if next_tick <= now {
            let missed = ((now - next_tick).as_nanos() / interval.as_nanos()) as u32 + 1;
            next_tick += interval * missed;
            report.skipped_ticks += u64::from(missed);
            log::warn!("run outlasted the {interval:?} interval, skipped {missed} tick(s)");
        }

        log::info!(
            "next run in {:.0}s",
            next_tick.saturating_duration_since(now).as_secs_f64()
        );
        if !shutdown.sleep(next_tick.saturating_duration_since(Instant::now())) {
            break;
        }
    }

    log::info!(
        "scheduler stopped after {} runs ({} aborted, {} ticks skipped)",
        report.runs,
        report.failed_runs,
        report.skipped_ticks
    );
    report
}
