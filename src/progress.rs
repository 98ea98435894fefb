//! Completion counting and progress reporting.

use std::sync::atomic::{AtomicU64, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Receives progress samples.
pub trait ProgressSink: Send + Sync {
    /// Called once before the first sample with the size of the run.
    fn start(&self, _total: u64) {}

    fn report(&self, completed: u64, total: u64);

    /// Called once after the run, whatever the final count.
    fn finish(&self, _completed: u64, _total: u64) {}
}

/// Logs progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, completed: u64, total: u64) {
        info!(completed, total, percent = percent(completed, total), "Progress");
    }
}

const BAR_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} badges ({eta})";

/// Progress bar on stderr.
#[derive(Clone)]
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        bar.set_style(style);
        Self::with_bar(bar)
    }

    /// Drives an existing bar, e.g. one with a custom draw target.
    pub fn with_bar(bar: ProgressBar) -> Self {
        Self { bar }
    }

    pub fn bar(&self) -> &ProgressBar {
        &self.bar
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TerminalProgress {
    fn start(&self, total: u64) {
        self.bar.set_length(total);
    }

    fn report(&self, completed: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(completed);
    }

    fn finish(&self, completed: u64, _total: u64) {
        self.bar.set_position(completed);
        self.bar.finish();
    }
}

/// Discards all samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _completed: u64, _total: u64) {}
}

fn percent(completed: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        completed as f64 * 100.0 / total as f64
    }
}

/// Shared completion counter that samples into a sink every `every` jobs
/// and at the final job.
pub struct Progress<'a> {
    completed: AtomicU64,
    total: u64,
    every: u64,
    sink: &'a dyn ProgressSink,
}

impl<'a> Progress<'a> {
    pub fn new(total: u64, every: u64, sink: &'a dyn ProgressSink) -> Self {
        sink.start(total);
        Self {
            completed: AtomicU64::new(0),
            total,
            every: every.max(1),
            sink,
        }
    }

    /// Counts one finished job (rendered, failed or skipped).
    pub fn record(&self) -> u64 {
        let n = self.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if n % self.every == 0 || n == self.total {
            self.sink.report(n, self.total);
        }
        n
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn finish(&self) {
        self.sink.finish(self.completed(), self.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u64>>);

    impl ProgressSink for Recorder {
        fn report(&self, completed: u64, _total: u64) {
            self.0.lock().unwrap().push(completed);
        }
    }

    #[test]
    fn reports_on_cadence_and_final() {
        let sink = Recorder::default();
        let progress = Progress::new(7, 3, &sink);
        for _ in 0..7 {
            progress.record();
        }
        assert_eq!(*sink.0.lock().unwrap(), vec![3, 6, 7]);
        assert_eq!(progress.completed(), 7);
    }

    #[test]
    fn concurrent_records_are_all_counted() {
        let sink = Recorder::default();
        let progress = Progress::new(400, 100, &sink);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        progress.record();
                    }
                });
            }
        });
        assert_eq!(progress.completed(), 400);
        let mut seen = sink.0.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![100, 200, 300, 400]);
    }

    #[test]
    fn terminal_bar_tracks_samples() {
        let terminal = TerminalProgress::with_bar(ProgressBar::hidden());
        let progress = Progress::new(10, 4, &terminal);
        assert_eq!(terminal.bar().length(), Some(10));

        for _ in 0..5 {
            progress.record();
        }
        assert_eq!(terminal.bar().position(), 4);

        progress.finish();
        assert_eq!(terminal.bar().position(), 5);
        assert!(terminal.bar().is_finished());
    }

    #[test]
    fn percent_of_empty_total_is_complete() {
        assert_eq!(percent(0, 0), 100.0);
        assert_eq!(percent(1, 4), 25.0);
    }
}
