//! # imgbatch
//!
//! Batch image processing: take up to twenty images, resize them, re-encode
//! them at a chosen quality, optionally stamp a watermark, and report how
//! much smaller (or larger) each file became.
//!
//! # Architecture
//!
//! ```text
//! RawFile ──add_files──▶ ImageJob (Pending)
//!                              │
//!                  process_all │  rayon fan-out, one transform per job
//!                              ▼
//!            decode → resize → watermark → encode
//!                              │
//!                              ▼
//!                 Done(JobResult) | Failed(reason)
//!                              │
//!                              ▼
//!           AggregateReport, data URIs, files on disk
//! ```
//!
//! Every job is independent: a file that fails to decode or encode is marked
//! `Failed` and its siblings carry on. The aggregate report is derived on
//! demand from the jobs that reached `Done`.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Pure-Rust image operations: identify, decode, resize, watermark, encode |
//! | [`job`] | Per-file job and its status state machine |
//! | [`batch`] | Batch controller: intake cap, concurrent dispatch, cancellation |
//! | [`inputs`] | Reading input files and directories from disk |
//! | [`report`] | Before/after size totals over finished jobs |
//! | [`naming`] | Download filenames for processed images |
//! | [`export`] | Data URIs and writing results to a directory |
//! | [`config`] | `imgbatch.toml` loading and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Re-dispatch Always Starts From Source
//!
//! Changing the configuration and dispatching again re-runs every job from
//! its original bytes, including jobs that are already `Done`. Results never
//! feed back into a later dispatch, so dispatching the same configuration
//! twice produces the same outputs.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate for every codec and for
//! Lanczos3 resampling. No system libraries are needed.
//!
//! ## Swappable Backend
//!
//! All pixel work goes through the [`imaging::ImageBackend`] trait. The
//! controller is generic over it, so its scheduling and state handling are
//! tested against a recording mock without encoding real images.

pub mod batch;
pub mod config;
pub mod export;
pub mod imaging;
pub mod inputs;
pub mod job;
pub mod naming;
pub mod output;
pub mod report;

#[cfg(test)]
pub(crate) mod test_helpers;
