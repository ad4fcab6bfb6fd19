//! Shared test utilities for the imgbatch test suite.
//!
//! Provides file builders for intake (mock payloads understood by
//! `MockBackend`, real PNGs for `RustBackend`) and lookup helpers over job
//! snapshots.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let controller = BatchController::new(MockBackend::new());
//! controller.add_files(vec![mock_file("a.png", 40, 30), corrupt_file("b.png")]);
//! controller.process_all(&BatchConfiguration::default(), None).unwrap();
//!
//! let broken = find_job(&controller.jobs(), "b.png");
//! assert!(matches!(broken.status, JobStatus::Failed(_)));
//! ```

use crate::imaging::backend::tests::payload;
use crate::job::{JobView, RawFile};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// File builders
// =========================================================================

/// A file whose payload `MockBackend` decodes as a `width`×`height` image.
pub fn mock_file(name: &str, width: u32, height: u32) -> RawFile {
    RawFile::new(name, "image/png", payload(width, height))
}

/// `count` distinct small mock files named `img-01.png`, `img-02.png`, ...
pub fn mock_files(count: usize) -> Vec<RawFile> {
    (1..=count)
        .map(|i| mock_file(&format!("img-{i:02}.png"), 8 + i as u32, 6))
        .collect()
}

/// A file that claims to be a PNG but fails to decode with any backend.
pub fn corrupt_file(name: &str) -> RawFile {
    RawFile::new(name, "image/png", b"nope".to_vec())
}

/// A real PNG with a gradient so encoders have something to compress.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
            255,
        ])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn png_file(name: &str, width: u32, height: u32) -> RawFile {
    RawFile::new(name, "image/png", png_bytes(width, height))
}

// =========================================================================
// Lookups: panic with a clear message on miss
// =========================================================================

/// Find a job by file name. Panics if not found.
pub fn find_job(jobs: &[JobView], name: &str) -> JobView {
    jobs.iter()
        .find(|j| j.name == name)
        .cloned()
        .unwrap_or_else(|| {
            let names: Vec<&str> = jobs.iter().map(|j| j.name.as_str()).collect();
            panic!("job '{name}' not found. Available: {names:?}")
        })
}

/// Status labels in job order.
pub fn status_labels(jobs: &[JobView]) -> Vec<&'static str> {
    jobs.iter().map(|j| j.status.label()).collect()
}
