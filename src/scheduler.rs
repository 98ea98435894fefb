//! Parallel generation of the full combination space.
//!
//! ```text
//!  producer (calling thread)          workers (N scoped threads)
//! ┌──────────────────────────┐       ┌──────────────────────────┐
//! │ JobSpace::iter()         │       │ recv job                 │
//! │   exists? -> skip, count │ ────► │ composite -> quantize    │
//! │   else    -> send        │ bound │ encode -> write atomic   │
//! └──────────────────────────┘ queue │ count                    │
//!                                    └──────────────────────────┘
//! ```
//!
//! The queue is a `sync_channel` sized by [`RenderConfig::queue_capacity`],
//! so the producer blocks whenever the workers fall behind. Workers share the
//! receiving end behind a mutex.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use tracing::{debug, info, warn};

use crate::catalog::AssetCatalog;
use crate::config::RenderConfig;
use crate::error::Result;
use crate::job::{JobSpace, RenderJob, SINGLE_JOB_FILENAME};
use crate::output::OutputDir;
use crate::progress::{NoProgress, Progress, ProgressSink};
use crate::render::BadgeRenderer;

// ============================================================================
// State
// ============================================================================

/// Lifecycle of a [`Scheduler`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    Idle = 0,
    Enumerating = 1,
    Draining = 2,
    Done = 3,
}

impl SchedulerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Enumerating,
            2 => Self::Draining,
            _ => Self::Done,
        }
    }
}

/// Cooperative stop flag shared between a run and whoever may stop it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Outcome counts of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Size of the combination space.
    pub total: u64,
    /// Outputs that already existed.
    pub skipped: u64,
    pub rendered: u64,
    pub failed: u64,
    pub cancelled: bool,
}

impl RunSummary {
    /// True if every job in the space was either rendered or skipped.
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failed == 0 && self.skipped + self.rendered == self.total
    }

    /// True if no job failed and the run was not cancelled.
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed == 0
    }
}

#[derive(Default)]
struct Counters {
    skipped: AtomicU64,
    rendered: AtomicU64,
    failed: AtomicU64,
}

// ============================================================================
// Scheduler
// ============================================================================

/// Drives every job of a catalog through a bounded worker pool.
pub struct Scheduler<'a> {
    catalog: &'a AssetCatalog,
    config: &'a RenderConfig,
    output: OutputDir,
    cancel: CancelToken,
    sink: &'a dyn ProgressSink,
    state: AtomicU8,
}

impl<'a> Scheduler<'a> {
    pub fn new(catalog: &'a AssetCatalog, config: &'a RenderConfig, output: OutputDir) -> Self {
        Self {
            catalog,
            config,
            output,
            cancel: CancelToken::new(),
            sink: &NoProgress,
            state: AtomicU8::new(SchedulerState::Idle as u8),
        }
    }

    /// Uses an externally owned cancellation token.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress_sink(mut self, sink: &'a dyn ProgressSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
        debug!(?state, "Scheduler state");
    }

    /// Renders every missing output.
    ///
    /// Per-job failures are logged and counted, not returned. Errors are
    /// reserved for invalid settings and an unusable output directory.
    pub fn run(&self) -> Result<RunSummary> {
        self.config.validate()?;

        let space = JobSpace::new(self.catalog);
        let total = space.len();

        if space.is_empty() {
            info!("Combination space is empty, nothing to render");
            self.set_state(SchedulerState::Done);
            return Ok(RunSummary::default());
        }

        let existing = self.output.existing()?;
        self.output.ensure()?;

        let workers = self.config.worker_count();
        let capacity = self.config.queue_capacity();
        info!(
            total,
            existing = existing.len(),
            workers,
            capacity,
            dir = %self.output.root().display(),
            "Starting generation"
        );

        let renderer = BadgeRenderer::new(self.catalog, self.config.compression);
        let progress = Progress::new(total, self.config.progress_every, self.sink);
        let counters = Counters::default();
        let (tx, rx) = sync_channel::<RenderJob>(capacity);
        let rx = Mutex::new(rx);

        self.set_state(SchedulerState::Enumerating);
        thread::scope(|scope| {
            for id in 0..workers {
                let (rx, renderer, progress, counters) = (&rx, &renderer, &progress, &counters);
                scope.spawn(move || self.work(id, rx, renderer, progress, counters));
            }

            self.enumerate(&space, &existing, &tx, &progress, &counters);
            drop(tx);
            self.set_state(SchedulerState::Draining);
        });
        progress.finish();
        self.set_state(SchedulerState::Done);

        let summary = RunSummary {
            total,
            skipped: counters.skipped.load(Ordering::Acquire),
            rendered: counters.rendered.load(Ordering::Acquire),
            failed: counters.failed.load(Ordering::Acquire),
            cancelled: self.cancel.is_cancelled(),
        };
        info!(
            rendered = summary.rendered,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Generation finished"
        );
        Ok(summary)
    }

    fn enumerate(
        &self,
        space: &JobSpace<'_>,
        existing: &HashSet<String>,
        tx: &SyncSender<RenderJob>,
        progress: &Progress<'_>,
        counters: &Counters,
    ) {
        for job in space.iter() {
            if self.cancel.is_cancelled() {
                info!("Cancelled, stopping enumeration");
                break;
            }
            if existing.contains(&job.filename()) {
                counters.skipped.fetch_add(1, Ordering::AcqRel);
                progress.record();
                continue;
            }
            if tx.send(job).is_err() {
                break;
            }
        }
    }

    fn work(
        &self,
        id: usize,
        rx: &Mutex<Receiver<RenderJob>>,
        renderer: &BadgeRenderer<'_>,
        progress: &Progress<'_>,
        counters: &Counters,
    ) {
        loop {
            // Holding the lock across `recv` serializes receivers.
            let next = rx.lock().unwrap_or_else(PoisonError::into_inner).recv();
            let Ok(job) = next else {
                break;
            };
            // Keep draining after cancellation so the producer never blocks.
            if self.cancel.is_cancelled() {
                continue;
            }

            match self.render_to_disk(renderer, &job) {
                Ok(_) => {
                    counters.rendered.fetch_add(1, Ordering::AcqRel);
                }
                Err(e) => {
                    warn!(worker = id, job = %job, error = %e, "Job failed");
                    counters.failed.fetch_add(1, Ordering::AcqRel);
                }
            }
            progress.record();
        }
        debug!(worker = id, "Worker exiting");
    }

    fn render_to_disk(&self, renderer: &BadgeRenderer<'_>, job: &RenderJob) -> Result<PathBuf> {
        let bytes = renderer.render_png(job)?;
        self.output.write_atomic(&job.filename(), &bytes)
    }
}

// ============================================================================
// Single-job Mode
// ============================================================================

/// Renders one `S_B_C1_C2` job synchronously into `badge.png`.
///
/// Malformed or out-of-range input fails before anything touches the disk.
pub fn run_single(
    catalog: &AssetCatalog,
    config: &RenderConfig,
    output: &OutputDir,
    input: &str,
) -> Result<PathBuf> {
    config.validate()?;
    let job: RenderJob = input.parse()?;
    let renderer = BadgeRenderer::new(catalog, config.compression);
    let bytes = renderer.render_png(&job)?;

    output.ensure()?;
    let path = output.write_atomic(SINGLE_JOB_FILENAME, &bytes)?;
    info!(job = %job, path = %path.display(), "Rendered single badge");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColorEntry, IconAsset, IconLayer, LayerAffinity};
    use crate::error::BadgeError;
    use crate::mask::Mask;
    use image::{GrayImage, Luma};
    use palette::Srgb;

    fn catalog(symbols: usize) -> AssetCatalog {
        let colors = vec![
            ColorEntry::new(0, Srgb::new(250, 10, 10), LayerAffinity::Primary),
            ColorEntry::new(1, Srgb::new(10, 10, 250), LayerAffinity::Secondary),
        ];
        let mut alpha = GrayImage::new(6, 6);
        alpha.put_pixel(2, 2, Luma([255]));
        let mask = Mask::from_alpha(alpha);

        let mut icons: Vec<IconAsset> = (0..symbols)
            .map(|index| IconAsset {
                index,
                layer: IconLayer::Symbol,
                mask: Some(mask.clone()),
                outline: None,
            })
            .collect();
        icons.push(IconAsset {
            index: symbols,
            layer: IconLayer::Border,
            mask: None,
            outline: None,
        });
        AssetCatalog::from_parts(6, colors, icons)
    }

    #[test]
    fn state_moves_to_done() {
        let catalog = catalog(3);
        let config = RenderConfig::new().with_workers(2);
        let dir = tempfile::tempdir().unwrap();
        let scheduler = Scheduler::new(&catalog, &config, OutputDir::new(dir.path()));

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        let summary = scheduler.run().unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Done);
        assert_eq!(summary.rendered, 3);
        assert!(summary.is_complete());
    }

    #[test]
    fn small_queue_still_drains() {
        let catalog = catalog(40);
        let mut config = RenderConfig::new().with_workers(1);
        config.queue_depth_per_worker = 1;
        let dir = tempfile::tempdir().unwrap();

        let summary = Scheduler::new(&catalog, &config, OutputDir::new(dir.path()))
            .run()
            .unwrap();
        assert_eq!(summary.rendered, 40);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 40);
    }

    #[test]
    fn cancelled_run_renders_nothing() {
        let catalog = catalog(5);
        let config = RenderConfig::new().with_workers(2);
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let summary = Scheduler::new(&catalog, &config, OutputDir::new(dir.path()))
            .with_cancel_token(cancel)
            .run()
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.rendered, 0);
        assert!(!summary.is_complete());
    }

    /// Cancels the run once a given number of jobs have completed.
    struct CancelAfter {
        token: CancelToken,
        after: u64,
    }

    impl ProgressSink for CancelAfter {
        fn report(&self, completed: u64, _total: u64) {
            if completed >= self.after {
                self.token.cancel();
            }
        }
    }

    #[test]
    fn cancellation_mid_run_stops_enumeration() {
        let catalog = catalog(200);
        let mut config = RenderConfig::new().with_workers(2).with_progress_every(1);
        config.queue_depth_per_worker = 1;
        let dir = tempfile::tempdir().unwrap();

        let token = CancelToken::new();
        let sink = CancelAfter {
            token: token.clone(),
            after: 5,
        };
        let summary = Scheduler::new(&catalog, &config, OutputDir::new(dir.path()))
            .with_cancel_token(token)
            .with_progress_sink(&sink)
            .run()
            .unwrap();

        assert!(summary.cancelled);
        assert!(!summary.is_success());
        assert!(summary.rendered >= 5);
        assert!(summary.rendered + summary.skipped + summary.failed < summary.total);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".partial")));
        assert_eq!(names.len() as u64, summary.rendered);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let catalog = catalog(1);
        let config = RenderConfig::new().with_workers(0);
        let dir = tempfile::tempdir().unwrap();

        let scheduler = Scheduler::new(&catalog, &config, OutputDir::new(dir.path()));
        let err = scheduler.run().unwrap_err();
        assert!(matches!(err, BadgeError::InvalidConfig { field: "workers", .. }));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[test]
    fn invalid_config_is_rejected_for_single_job() {
        let catalog = catalog(1);
        let config = RenderConfig::new().with_canvas_size(0);
        let dir = tempfile::tempdir().unwrap();

        let err = run_single(&catalog, &config, &OutputDir::new(dir.path()), "0_1_0_1").unwrap_err();
        assert!(matches!(err, BadgeError::InvalidConfig { .. }));
    }

    #[test]
    fn empty_space_is_done_without_output_dir() {
        let catalog = AssetCatalog::from_parts(6, vec![], vec![]);
        let config = RenderConfig::new();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let scheduler = Scheduler::new(&catalog, &config, OutputDir::new(out.clone()));
        let summary = scheduler.run().unwrap();
        assert_eq!(summary, RunSummary::default());
        assert_eq!(scheduler.state(), SchedulerState::Done);
        assert!(!out.exists());
    }

    #[test]
    fn single_job_rejects_wrong_layer() {
        let catalog = catalog(1);
        let dir = tempfile::tempdir().unwrap();
        let output = OutputDir::new(dir.path().join("single"));

        // Icon 1 is a border, so it cannot be the symbol
        let err = run_single(&catalog, &RenderConfig::new(), &output, "1_1_0_1").unwrap_err();
        assert!(err.is_usage());
        assert!(!output.root().exists());
    }
}
