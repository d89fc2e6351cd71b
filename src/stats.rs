use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

/// Elapsed time and display count for one cadence run.
#[derive(Debug, Clone, Copy)]
pub struct Stats {
    started_at: Instant,
    displayed: u64,
}

/// Point-in-time copy of [`Stats`] for the display sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub elapsed: Duration,
    pub displayed: u64,
}

impl Stats {
    /// Fresh stats starting now with nothing displayed.
    #[must_use]
    pub fn start() -> Self {
        Self::start_at(Instant::now())
    }

    #[must_use]
    pub const fn start_at(started_at: Instant) -> Self {
        Self {
            started_at,
            displayed: 0,
        }
    }

    pub const fn record_display(&mut self) {
        self.displayed += 1;
    }

    #[must_use]
    pub const fn displayed(&self) -> u64 {
        self.displayed
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.snapshot_at(Instant::now())
    }

    #[must_use]
    pub fn snapshot_at(&self, now: Instant) -> StatsSnapshot {
        StatsSnapshot {
            elapsed: now.saturating_duration_since(self.started_at),
            displayed: self.displayed,
        }
    }
}

impl StatsSnapshot {
    /// Elapsed time as `MM:SS`; minutes wrap at the hour like a clock face.
    #[must_use]
    pub fn elapsed_mmss(&self) -> String {
        let secs = self.elapsed.as_secs();
        format!("{:02}:{:02}", (secs / 60) % 60, secs % 60)
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Elapsed Time: {} | Images Displayed: {}",
            self.elapsed_mmss(),
            self.displayed
        )
    }
}
