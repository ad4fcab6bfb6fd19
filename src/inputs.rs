//! Reading inputs from disk.
//!
//! Files are screened by extension before any bytes are read: unsupported
//! types are only named, and reading stops once the batch's free capacity is
//! used up. A file that can't be read is logged and skipped; it never aborts
//! the rest of the collection.

use crate::batch::{BATCH_CAPACITY, BatchController, CapacityExceeded, Intake};
use crate::imaging::{ImageBackend, is_supported_mime};
use crate::job::{RawFile, mime_type_for_path};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Files read from disk plus everything screened out on the way.
#[derive(Debug, Default)]
pub struct CollectedInputs {
    pub files: Vec<RawFile>,
    /// Names with an extension no decoder supports. Never read.
    pub unsupported: Vec<String>,
    /// Paths that failed to read.
    pub unreadable: Vec<String>,
    /// Supported files left unread because capacity was reached.
    pub over_capacity: usize,
}

impl CollectedInputs {
    /// Add the collected files to `controller`, folding the screened-out
    /// files into the returned [`Intake`].
    pub fn submit<B: ImageBackend>(self, controller: &BatchController<B>) -> Intake {
        let mut intake = controller.add_files(self.files);
        let mut unsupported = self.unsupported;
        unsupported.append(&mut intake.unsupported);
        intake.unsupported = unsupported;
        intake.unreadable = self.unreadable;

        if self.over_capacity > 0 {
            let rejected = intake.capacity_exceeded.map_or(0, |c| c.rejected) + self.over_capacity;
            intake.capacity_exceeded = Some(CapacityExceeded {
                rejected,
                capacity: BATCH_CAPACITY,
            });
        }
        intake
    }
}

/// Collect files from `inputs`; directories contribute their direct children.
///
/// At most `capacity` supported files are read.
pub fn collect_inputs(inputs: &[PathBuf], capacity: usize) -> CollectedInputs {
    let mut collected = CollectedInputs::default();
    for input in inputs {
        if input.is_dir() {
            for entry in WalkDir::new(input)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
            {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        collect_file(&mut collected, entry.path(), capacity);
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!(dir = %input.display(), error = %err, "skipping unreadable entry");
                        let path = err.path().unwrap_or(input.as_path());
                        collected.unreadable.push(path.display().to_string());
                    }
                }
            }
        } else {
            collect_file(&mut collected, input, capacity);
        }
    }
    if collected.over_capacity > 0 {
        debug!(
            over_capacity = collected.over_capacity,
            capacity, "stopped reading inputs at capacity"
        );
    }
    collected
}

fn collect_file(collected: &mut CollectedInputs, path: &Path, capacity: usize) {
    if !is_supported_mime(mime_type_for_path(path)) {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(name = %name, "skipping unsupported file");
        collected.unsupported.push(name);
        return;
    }
    if collected.files.len() >= capacity {
        collected.over_capacity += 1;
        return;
    }
    match RawFile::from_path(path) {
        Ok(file) => collected.files.push(file),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "skipping unreadable file");
            collected.unreadable.push(path.display().to_string());
        }
    }
}
