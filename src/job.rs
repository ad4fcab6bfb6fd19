//! Per-file jobs and their status state machine.
//!
//! A job wraps one accepted file. Its source bytes are immutable and owned by
//! the job alone; everything else lives behind a mutex so the batch
//! controller can move it through its states from any rayon worker.
//!
//! ```text
//!             begin            complete
//!  Pending ──────────▶ Processing ──────────▶ Done
//!     │                    │
//!     │ cancel             │ fail / cancel
//!     └────────────────────┴────────────────▶ Failed(reason)
//!
//!  any state ── reset ──▶ Pending      (start of every dispatch)
//! ```
//!
//! Transitions that don't apply to the current state are refused (the method
//! returns `false`) rather than panicking: a worker finishing after a cancel
//! simply loses the race.

use crate::imaging::{Dimensions, OutputFormat, TransformError, TransformOutput};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Opaque job identifier, unique within one controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(pub(crate) u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A file offered for intake: a name, its declared MIME type, and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, declaring its MIME type from the extension.
    ///
    /// Unknown extensions are declared as `application/octet-stream` and will
    /// be dropped at intake.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, mime_type_for_path(path), bytes))
    }
}

/// MIME type implied by a file's extension, `application/octet-stream` when unknown.
pub fn mime_type_for_path(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|fmt| fmt.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Why a job ended in `Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("cancelled")]
    Cancelled,
}

impl From<TransformError> for FailureReason {
    fn from(err: TransformError) -> Self {
        match err {
            TransformError::Decode(msg) => Self::Decode(msg),
            TransformError::Encode(msg) => Self::Encode(msg),
        }
    }
}

/// Output of a finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobResult {
    #[serde(skip)]
    pub encoded: Arc<[u8]>,
    pub dimensions: Dimensions,
    pub byte_size: u64,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Done(JobResult),
    Failed(FailureReason),
}

impl JobStatus {
    /// `Done` or `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Done(_) => "done",
            Self::Failed(FailureReason::Cancelled) => "cancelled",
            Self::Failed(_) => "failed",
        }
    }

    pub fn result(&self) -> Option<&JobResult> {
        match self {
            Self::Done(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    original_dimensions: Option<Dimensions>,
}

/// One unit of per-file work.
#[derive(Debug)]
pub struct ImageJob {
    id: JobId,
    name: String,
    mime_type: String,
    source: Arc<[u8]>,
    state: Mutex<JobState>,
}

impl ImageJob {
    pub(crate) fn new(id: JobId, file: RawFile) -> Self {
        Self {
            id,
            name: file.name,
            mime_type: file.mime_type,
            source: file.bytes.into(),
            state: Mutex::new(JobState {
                status: JobStatus::Pending,
                original_dimensions: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn original_byte_size(&self) -> u64 {
        self.source.len() as u64
    }

    /// Unknown until dimension discovery or the first decode.
    pub fn original_dimensions(&self) -> Option<Dimensions> {
        self.state().original_dimensions
    }

    pub fn status(&self) -> JobStatus {
        self.state().status.clone()
    }

    pub fn view(&self) -> JobView {
        let state = self.state();
        JobView {
            id: self.id,
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            original_byte_size: self.original_byte_size(),
            original_dimensions: state.original_dimensions,
            status: state.status.clone(),
        }
    }

    pub(crate) fn set_original_dimensions(&self, dims: Dimensions) {
        self.state().original_dimensions = Some(dims);
    }

    /// Any state → `Pending`, dropping a previous result.
    pub(crate) fn reset(&self) {
        self.state().status = JobStatus::Pending;
    }

    /// `Pending` → `Processing`.
    pub(crate) fn begin(&self) -> bool {
        let mut state = self.state();
        if state.status != JobStatus::Pending {
            return false;
        }
        state.status = JobStatus::Processing;
        true
    }

    /// `Processing` → `Done`.
    pub(crate) fn complete(&self, output: TransformOutput, format: OutputFormat) -> bool {
        let mut state = self.state();
        if state.status != JobStatus::Processing {
            return false;
        }
        state.original_dimensions = Some(output.source_dimensions);
        state.status = JobStatus::Done(JobResult {
            byte_size: output.encoded.len() as u64,
            encoded: output.encoded.into(),
            dimensions: output.dimensions,
            format,
        });
        true
    }

    /// `Processing` → `Failed(reason)`.
    pub(crate) fn fail(&self, reason: FailureReason) -> bool {
        let mut state = self.state();
        if state.status != JobStatus::Processing {
            return false;
        }
        state.status = JobStatus::Failed(reason);
        true
    }

    /// `Pending` or `Processing` → `Failed(Cancelled)`.
    pub(crate) fn cancel(&self) -> bool {
        let mut state = self.state();
        if state.status.is_terminal() {
            return false;
        }
        state.status = JobStatus::Failed(FailureReason::Cancelled);
        true
    }
}

/// A point-in-time copy of a job for display and reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub name: String,
    pub mime_type: String,
    pub original_byte_size: u64,
    pub original_dimensions: Option<Dimensions>,
    pub status: JobStatus,
}
