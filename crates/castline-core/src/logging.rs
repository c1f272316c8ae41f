//! Logging setup: env_logger behind the `log` facade, bridged through
//! indicatif when progress bars are on screen.

use indicatif::MultiProgress;

/// Timestamp layout for non-TTY log lines.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Strip the crate prefix so `castline_pipeline::runner` logs as `pipeline::runner`.
fn short_target(target: &str) -> &str {
    target.strip_prefix("castline_").unwrap_or(target)
}

/// Render one plain (non-TTY) log line.
fn plain_line(record: &log::Record<'_>, now: chrono::DateTime<chrono::Local>) -> String {
    let (_, label, _) = level_style(record.level(), false);
    format!(
        "[{}] [{}] {}: {}",
        now.format(TIMESTAMP_FORMAT),
        label.trim_end(),
        short_target(record.target()),
        record.args()
    )
}

/// Logger that prints through indicatif MultiProgress so log lines don't tear the item spinners.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            let (pre, label, post) = level_style(record.level(), true);
            let line = format!("[{pre}{label}{post}] {}", record.args());
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initialize logging with optional TTY mode (indicatif integration).
///
/// `RUST_LOG` still wins over the level picked from `quiet` / `debug`.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let default_level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    if let Some(multi) = multi {
        let logger = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(default_level),
        )
        .build();
        let max_level = logger.filter();

        log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.clone())))
            .expect("failed to init logger");
        log::set_max_level(max_level);
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .format(|buf, record| writeln!(buf, "{}", plain_line(record, chrono::Local::now())))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn short_target_strips_crate_prefix() {
        assert_eq!(short_target("castline_pipeline::runner"), "pipeline::runner");
        assert_eq!(short_target("reqwest::connect"), "reqwest::connect");
    }

    #[test]
    fn plain_line_layout() {
        let now = chrono::Local
            .with_ymd_and_hms(2025, 3, 9, 14, 5, 0)
            .single()
            .unwrap();
        let line = plain_line(
            &log::Record::builder()
                .args(format_args!("run started"))
                .level(log::Level::Warn)
                .target("castline_pipeline::runner")
                .build(),
            now,
        );
        assert_eq!(line, "[2025-03-09 14:05:00] [WARN] pipeline::runner: run started");
    }

    #[test]
    fn level_style_plain_has_no_ansi() {
        let (pre, label, post) = level_style(log::Level::Error, false);
        assert_eq!(pre, "");
        assert_eq!(label, "ERROR");
        assert_eq!(post, "");
    }
}
