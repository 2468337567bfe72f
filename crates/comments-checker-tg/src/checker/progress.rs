use crate::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Number of cells in the progress bar
const PROGRESS_BAR_WIDTH: usize = 12;

/// Snapshot of the run progress taken after a channel was checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Progress {
    pub(crate) processed: usize,
    pub(crate) total: usize,
    pub(crate) elapsed: Duration,
}

/// Receives the progress of the run. Implementations are expected to
/// overwrite the previously displayed progress instead of appending a new one.
#[async_trait]
pub(crate) trait ProgressSink: Send {
    async fn tick(&mut self, progress: Progress) -> Result;
}

impl Progress {
    /// Whole percent of the processed channels. An empty run is complete.
    pub(crate) fn percentage(&self) -> usize {
        if self.total == 0 {
            return 100;
        }
        self.processed * 100 / self.total
    }

    /// Linear extrapolation of the time spent per channel so far
    pub(crate) fn eta(&self) -> Duration {
        if self.processed == 0 {
            return Duration::ZERO;
        }

        let remaining = self.total.saturating_sub(self.processed);
        let per_item = self.elapsed.as_secs_f64() / self.processed as f64;

        Duration::from_secs_f64(per_item * remaining as f64)
    }

    fn bar(&self) -> String {
        let filled = if self.total == 0 {
            PROGRESS_BAR_WIDTH
        } else {
            (self.processed * PROGRESS_BAR_WIDTH / self.total).min(PROGRESS_BAR_WIDTH)
        };

        "▓".repeat(filled) + &"░".repeat(PROGRESS_BAR_WIDTH - filled)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let eta = self.eta().as_secs();

        write!(
            f,
            "{}% {} {}/{}\nETA: {} min. {} s.",
            self.percentage(),
            self.bar(),
            self.processed,
            self.total,
            eta / 60,
            eta % 60,
        )
    }
}
