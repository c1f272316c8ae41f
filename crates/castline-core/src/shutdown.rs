//! Graceful shutdown support via a shared atomic flag

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Granularity of interruptible sleeps
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Exit code used when a second signal forces the process down
pub const FORCED_EXIT_CODE: i32 = 130;

/// Shared shutdown flag, set by SIGTERM/SIGINT or by [`Shutdown::request`].
///
/// Cloning is cheap; every clone observes the same flag.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    flag: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown was requested
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Request shutdown
    pub fn request(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Route SIGTERM/SIGINT into this flag.
    ///
    /// First signal: set the flag, letting in-flight work finish.
    /// Second signal: exit immediately with code 130.
    pub fn install_signal_handlers(&self) -> std::io::Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::flag;

        for signal in [SIGTERM, SIGINT] {
            // Order matters: the conditional exit must see the flag before it is set.
            flag::register_conditional_shutdown(signal, FORCED_EXIT_CODE, self.flag.clone())?;
            flag::register(signal, self.flag.clone())?;
        }
        Ok(())
    }

    /// Sleep for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if interrupted.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}
