//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: one overall bar per run plus a spinner per in-flight item.
//! Non-TTY mode: hidden bars, logs carry the progress.

use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Width of the item prefix column
const PREFIX_WIDTH: usize = 24;

fn run_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} items {wide_msg:.dim}",
    )
    .expect("invalid template")
    .progress_chars("=>-")
}

fn item_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix:<24.dim} {wide_msg}")
        .expect("invalid template")
}

/// Truncate a label on a char boundary so bars stay aligned.
fn truncate_label(name: &str) -> String {
    if name.chars().count() <= PREFIX_WIDTH {
        return name.to_string();
    }
    let mut out: String = name.chars().take(PREFIX_WIDTH - 1).collect();
    out.push('~');
    out
}

/// Central progress context managing multi-progress bars.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        let is_tty = std::io::stderr().is_terminal();
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Context that never draws anything (tests, `--quiet` pipelines).
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty: false,
        }
    }

    /// Overall bar for one run, `total` = dispatched items.
    pub fn run_bar(&self, total: usize) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(total as u64));
        pb.set_style(run_style());
        pb
    }

    /// Spinner line for one in-flight item.
    ///
    /// Update with `pb.set_message(...)` as the item moves through stages,
    /// call `pb.finish_and_clear()` when it is done.
    pub fn item_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(item_style());
        pb.set_prefix(truncate_label(name));
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Whether running in TTY mode.
    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_short_label_unchanged() {
        assert_eq!(truncate_label("bbc-world"), "bbc-world");
    }

    #[test]
    fn truncate_long_label() {
        let label = truncate_label("a-very-long-feed-name-that-does-not-fit");
        assert_eq!(label.chars().count(), PREFIX_WIDTH);
        assert!(label.ends_with('~'));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let label = truncate_label(&"é".repeat(40));
        assert_eq!(label.chars().count(), PREFIX_WIDTH);
    }

    #[test]
    fn hidden_context_hands_out_hidden_bars() {
        let progress = ProgressContext::hidden();
        assert!(!progress.is_tty());
        assert!(progress.run_bar(10).is_hidden());
        assert!(progress.item_line("item").is_hidden());
    }
}
