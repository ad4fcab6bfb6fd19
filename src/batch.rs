//! The batch controller: intake, fan-out, cancellation, and reporting.
//!
//! A batch holds at most [`BATCH_CAPACITY`] jobs. [`BatchController::process_all`]
//! re-runs the full configuration against every job, whatever state it is in:
//! there is no incremental re-processing.
//!
//! ## Dispatch
//!
//! ```text
//! process_all(config)
//!   ├─ claim the processing flag (one dispatch at a time)
//!   ├─ decode the watermark once, shared read-only by every worker
//!   ├─ reset every job → Pending
//!   ├─ rayon fan-out: Pending → Processing → Done | Failed
//!   └─ release the flag once every job has settled
//! ```
//!
//! A failing job never aborts its siblings; its reason is recorded on the job
//! and the dispatch carries on. [`BatchController::cancel`] is best-effort:
//! jobs still queued never start, jobs mid-transform are marked
//! `Failed(Cancelled)` right away and their late results are discarded.
//!
//! ## Progress
//!
//! Callers may pass an `mpsc::Sender<BatchEvent>`; events arrive in worker
//! completion order, which is not the job order.

use crate::config::{ConfigError, PipelineConfig};
use crate::imaging::{
    Anchor, BackendError, ImageBackend, OutputFormat, Quality, Surface, TransformSpec,
    WatermarkPlacement, is_supported_mime, transform,
};
use crate::job::{FailureReason, ImageJob, JobId, JobStatus, JobView, RawFile};
use crate::report::AggregateReport;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Maximum number of jobs a batch holds. Excess files are rejected at
/// intake, never queued.
pub const BATCH_CAPACITY: usize = 20;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("A dispatch is already running")]
    AlreadyProcessing,
    #[error("Watermark image could not be decoded: {0}")]
    Watermark(#[source] BackendError),
}

/// Watermark to composite onto every output.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    /// Encoded watermark image (decoded once per dispatch).
    pub image: Arc<[u8]>,
    /// 0 (invisible) to 1 (opaque).
    pub opacity: f32,
    /// Watermark width as a percentage of the output width.
    pub scale_percent: f64,
    pub anchor: Anchor,
    /// Inward offset from the anchored edges, in pixels.
    pub padding: u32,
}

/// What every job in a dispatch should become.
///
/// Read-only for the duration of a dispatch; change it and dispatch again.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchConfiguration {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub lock_aspect: bool,
    pub format: OutputFormat,
    pub quality: Quality,
    pub watermark: Option<WatermarkSpec>,
}

impl Default for BatchConfiguration {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            lock_aspect: true,
            format: OutputFormat::default(),
            quality: Quality::default(),
            watermark: None,
        }
    }
}

impl BatchConfiguration {
    /// Build from a validated config file, reading the watermark image from disk.
    pub fn from_pipeline_config(config: &PipelineConfig) -> Result<Self, ConfigError> {
        let watermark = match &config.watermark {
            Some(wm) => {
                let bytes = std::fs::read(&wm.path).map_err(|source| ConfigError::Watermark {
                    path: wm.path.clone(),
                    source,
                })?;
                Some(WatermarkSpec {
                    image: bytes.into(),
                    opacity: wm.opacity,
                    scale_percent: wm.scale,
                    anchor: wm.anchor,
                    padding: wm.padding,
                })
            }
            None => None,
        };
        Ok(Self {
            width: config.resize.width,
            height: config.resize.height,
            lock_aspect: config.resize.lock_aspect,
            format: config.output.format,
            quality: Quality::new(config.output.quality),
            watermark,
        })
    }

    fn transform_spec(&self) -> TransformSpec {
        TransformSpec {
            width: self.width,
            height: self.height,
            lock_aspect: self.lock_aspect,
            format: self.format,
            quality: self.quality,
            watermark: self.watermark.as_ref().map(|wm| WatermarkPlacement {
                opacity: wm.opacity,
                scale_percent: wm.scale_percent,
                anchor: wm.anchor,
                padding: wm.padding,
            }),
        }
    }
}

/// Non-blocking notice that intake hit the batch cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityExceeded {
    /// Supported files turned away because the batch was full.
    pub rejected: usize,
    pub capacity: usize,
}

/// Outcome of one [`BatchController::add_files`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Intake {
    pub accepted: Vec<JobView>,
    /// Names of files dropped for an unsupported MIME type.
    pub unsupported: Vec<String>,
    /// Files that could not be read from disk. Only filled when intake went
    /// through [`crate::inputs::CollectedInputs::submit`].
    pub unreadable: Vec<String>,
    pub capacity_exceeded: Option<CapacityExceeded>,
}

/// Terminal-state counts for one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DispatchSummary {
    pub done: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl DispatchSummary {
    fn tally<'a>(statuses: impl IntoIterator<Item = &'a JobStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            match status {
                JobStatus::Done(_) => summary.done += 1,
                JobStatus::Failed(FailureReason::Cancelled) => summary.cancelled += 1,
                JobStatus::Failed(_) => summary.failed += 1,
                JobStatus::Pending | JobStatus::Processing => {}
            }
        }
        summary
    }
}

/// Progress notifications emitted during a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEvent {
    DispatchStarted { job_count: usize },
    JobStarted { id: JobId, name: String },
    JobSettled(JobView),
    DispatchFinished(DispatchSummary),
}

/// Owns the jobs of one batch and runs dispatches over them.
pub struct BatchController<B: ImageBackend> {
    backend: B,
    jobs: RwLock<Vec<Arc<ImageJob>>>,
    next_id: AtomicU64,
    selection: Mutex<Option<JobId>>,
    processing: AtomicBool,
    cancel_requested: AtomicBool,
    /// Jobs of the running dispatch, for cancellation.
    in_flight: Mutex<Vec<Arc<ImageJob>>>,
}

/// Releases the processing flag when a dispatch ends, however it ends.
struct DispatchGuard<'a, B: ImageBackend>(&'a BatchController<B>);

impl<B: ImageBackend> Drop for DispatchGuard<'_, B> {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.0.in_flight);
        in_flight.clear();
        self.0.cancel_requested.store(false, Ordering::SeqCst);
        self.0.processing.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn emit(progress: Option<&Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = progress {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

impl<B: ImageBackend> BatchController<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            jobs: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            selection: Mutex::new(None),
            processing: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn read_jobs(&self) -> RwLockReadGuard<'_, Vec<Arc<ImageJob>>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, Vec<Arc<ImageJob>>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Intake and batch membership
    // =========================================================================

    /// Accept files into the batch.
    ///
    /// Unsupported MIME types are dropped first; the rest are accepted until
    /// the batch reaches [`BATCH_CAPACITY`], and any surplus is reported via
    /// [`Intake::capacity_exceeded`]. Intake never decodes; see
    /// [`discover_dimensions`](Self::discover_dimensions).
    pub fn add_files(&self, files: impl IntoIterator<Item = RawFile>) -> Intake {
        let mut intake = Intake::default();
        let mut rejected = 0;
        let mut jobs = self.write_jobs();

        for file in files {
            if !is_supported_mime(&file.mime_type) {
                warn!(name = %file.name, mime = %file.mime_type, "dropping unsupported file");
                intake.unsupported.push(file.name);
                continue;
            }
            if jobs.len() >= BATCH_CAPACITY {
                rejected += 1;
                continue;
            }
            let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
            let job = Arc::new(ImageJob::new(id, file));
            debug!(job = %id, name = job.name(), bytes = job.original_byte_size(), "job accepted");
            intake.accepted.push(job.view());
            jobs.push(job);
        }

        if rejected > 0 {
            warn!(rejected, capacity = BATCH_CAPACITY, "batch is full");
            intake.capacity_exceeded = Some(CapacityExceeded {
                rejected,
                capacity: BATCH_CAPACITY,
            });
        }
        intake
    }

    /// Probe header dimensions for every job that doesn't know them yet.
    ///
    /// Returns how many jobs learned their dimensions. Undecodable payloads
    /// are left unknown; they will fail properly when processed.
    pub fn discover_dimensions(&self) -> usize {
        let unknown: Vec<Arc<ImageJob>> = self
            .read_jobs()
            .iter()
            .filter(|job| job.original_dimensions().is_none())
            .cloned()
            .collect();

        unknown
            .par_iter()
            .filter(|job| match self.backend.identify(job.source()) {
                Ok(dims) => {
                    job.set_original_dimensions(dims);
                    true
                }
                Err(err) => {
                    debug!(job = %job.id(), error = %err, "dimension probe failed");
                    false
                }
            })
            .count()
    }

    /// Remove one job regardless of its status.
    ///
    /// A running dispatch still settles the job but it no longer appears in
    /// the batch.
    pub fn remove_job(&self, id: JobId) -> bool {
        let removed = {
            let mut jobs = self.write_jobs();
            let before = jobs.len();
            jobs.retain(|job| job.id() != id);
            jobs.len() != before
        };
        if removed {
            let mut selection = lock(&self.selection);
            if *selection == Some(id) {
                *selection = None;
            }
            debug!(job = %id, "job removed");
        }
        removed
    }

    /// Remove every job.
    pub fn clear(&self) {
        self.write_jobs().clear();
        *lock(&self.selection) = None;
        debug!("batch cleared");
    }

    /// Select a job for preview. Unknown ids leave the selection unchanged.
    pub fn select(&self, id: JobId) -> bool {
        let known = self.read_jobs().iter().any(|job| job.id() == id);
        if known {
            *lock(&self.selection) = Some(id);
        }
        known
    }

    pub fn selection(&self) -> Option<JobId> {
        *lock(&self.selection)
    }

    pub fn len(&self) -> usize {
        self.read_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_jobs().is_empty()
    }

    /// Snapshot of every job, in intake order.
    pub fn jobs(&self) -> Vec<JobView> {
        self.read_jobs().iter().map(|job| job.view()).collect()
    }

    pub fn job(&self, id: JobId) -> Option<JobView> {
        self.read_jobs()
            .iter()
            .find(|job| job.id() == id)
            .map(|job| job.view())
    }

    /// Aggregate sizes over the jobs currently `Done`.
    pub fn report(&self) -> AggregateReport {
        AggregateReport::from_jobs(&self.jobs())
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// True from the start of a dispatch until every job in it has settled.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Run `config` against every job in the batch, concurrently.
    ///
    /// Blocks until all jobs settle. Fails up front, touching no job, when
    /// another dispatch is running or the watermark can't be decoded.
    pub fn process_all(
        &self,
        config: &BatchConfiguration,
        progress: Option<Sender<BatchEvent>>,
    ) -> Result<DispatchSummary, BatchError> {
        let guard = {
            // `cancel` checks the flag and sets its request under this lock too.
            let _in_flight = lock(&self.in_flight);
            if self
                .processing
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return Err(BatchError::AlreadyProcessing);
            }
            self.cancel_requested.store(false, Ordering::SeqCst);
            DispatchGuard(self)
        };

        let watermark = match &config.watermark {
            Some(wm) => Some(
                self.backend
                    .decode(&wm.image)
                    .map_err(BatchError::Watermark)?,
            ),
            None => None,
        };

        let jobs: Vec<Arc<ImageJob>> = self.read_jobs().clone();
        *lock(&self.in_flight) = jobs.clone();
        for job in &jobs {
            job.reset();
        }

        info!(
            jobs = jobs.len(),
            format = %config.format,
            quality = config.quality.value(),
            "dispatch started"
        );
        emit(
            progress.as_ref(),
            BatchEvent::DispatchStarted {
                job_count: jobs.len(),
            },
        );

        let spec = config.transform_spec();
        jobs.par_iter()
            .for_each(|job| self.run_job(job, &spec, watermark.as_ref(), progress.as_ref()));

        let statuses: Vec<JobStatus> = jobs.iter().map(|job| job.status()).collect();
        let summary = DispatchSummary::tally(&statuses);
        drop(guard);

        info!(
            done = summary.done,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "dispatch finished"
        );
        emit(progress.as_ref(), BatchEvent::DispatchFinished(summary));
        Ok(summary)
    }

    fn run_job(
        &self,
        job: &ImageJob,
        spec: &TransformSpec,
        watermark: Option<&Surface>,
        progress: Option<&Sender<BatchEvent>>,
    ) {
        if self.cancel_requested.load(Ordering::SeqCst) {
            job.cancel();
            emit(progress, BatchEvent::JobSettled(job.view()));
            return;
        }
        if !job.begin() {
            // Cancelled while queued.
            emit(progress, BatchEvent::JobSettled(job.view()));
            return;
        }
        emit(
            progress,
            BatchEvent::JobStarted {
                id: job.id(),
                name: job.name().to_string(),
            },
        );

        let applied = match transform(&self.backend, job.source(), spec, watermark) {
            Ok(output) => {
                debug!(
                    job = %job.id(),
                    from = job.original_byte_size(),
                    to = output.encoded.len(),
                    dimensions = %output.dimensions,
                    "job done"
                );
                job.complete(output, spec.format)
            }
            Err(err) => {
                warn!(job = %job.id(), name = job.name(), error = %err, "job failed");
                job.fail(err.into())
            }
        };
        if !applied {
            debug!(job = %job.id(), "result discarded after cancel");
        }
        emit(progress, BatchEvent::JobSettled(job.view()));
    }

    /// Cancel the running dispatch.
    ///
    /// Every job of the dispatch that hasn't settled is marked
    /// `Failed(Cancelled)` immediately. Returns how many jobs that affected;
    /// zero when nothing is running.
    pub fn cancel(&self) -> usize {
        let in_flight = lock(&self.in_flight);
        if !self.is_processing() {
            return 0;
        }
        self.cancel_requested.store(true, Ordering::SeqCst);
        let cancelled = in_flight.iter().filter(|job| job.cancel()).count();
        drop(in_flight);
        info!(cancelled, "dispatch cancelled");
        cancelled
    }
}
