//! Progress observation for wait loops.
//!
//! Rendering is separable from the polling itself: the waiter reports
//! ticks to a [`Progress`] observer and nothing else. The default
//! observer emits tracing events, with an occasional info-level
//! heartbeat so a quiet terminal still shows elapsed time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, info};

/// Observer of one wait loop's lifecycle.
pub trait Progress: Send + Sync {
    /// Called once per poll while the condition does not yet hold.
    fn tick(&self, condition: &str, elapsed: Duration);

    /// Called once when the condition holds.
    fn done(&self, condition: &str, elapsed: Duration);
}

/// Emits a debug event per tick and an info heartbeat every
/// `heartbeat_ticks` polls.
pub struct LogProgress {
    heartbeat_ticks: u64,
    ticks: AtomicU64,
}

impl LogProgress {
    pub fn new(heartbeat_ticks: u64) -> Self {
        Self {
            heartbeat_ticks: heartbeat_ticks.max(1),
            ticks: AtomicU64::new(0),
        }
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        // Roughly every ten seconds at the default 500ms interval.
        Self::new(20)
    }
}

impl Progress for LogProgress {
    fn tick(&self, condition: &str, elapsed: Duration) {
        let n = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if n % self.heartbeat_ticks == 0 {
            info!(
                condition = %condition,
                elapsed_secs = elapsed.as_secs(),
                "still waiting"
            );
        } else {
            debug!(condition = %condition, elapsed_ms = elapsed.as_millis() as u64, "waiting");
        }
    }

    fn done(&self, condition: &str, elapsed: Duration) {
        info!(
            condition = %condition,
            elapsed_secs = elapsed.as_secs(),
            "condition reached"
        );
    }
}

/// Silent observer.
pub struct NoProgress;

impl Progress for NoProgress {
    fn tick(&self, _condition: &str, _elapsed: Duration) {}
    fn done(&self, _condition: &str, _elapsed: Duration) {}
}
