//! Getting results out of a batch: data URIs for embedding, files on disk.

use crate::imaging::OutputFormat;
use crate::job::{JobStatus, JobView};
use crate::naming::{deduplicate, suggested_filename};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `data:<mime>;base64,<payload>` for an encoded image.
pub fn data_uri(format: OutputFormat, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", format.mime_type(), STANDARD.encode(bytes))
}

/// Byte size of the payload behind a base64 data URI, without decoding it.
///
/// Returns `None` when `uri` is not a base64 data URI.
pub fn data_uri_byte_size(uri: &str) -> Option<u64> {
    let rest = uri.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    let len = payload.len() as u64;
    let padding = payload.bytes().rev().take_while(|&b| b == b'=').count() as u64;
    // Unpadded tails of 2 or 3 chars carry 1 or 2 bytes.
    let tail = match len % 4 {
        0 | 1 => 0,
        rem => rem - 1,
    };
    Some((len / 4 * 3 + tail).saturating_sub(padding))
}

/// Write every `Done` job into `dir`, creating it if needed.
///
/// Files are named by [`suggested_filename`]; names that collide within the
/// batch get a `-N` suffix. Returns the written paths in job order.
pub fn write_results(jobs: &[JobView], dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut taken = HashSet::new();
    let mut written = Vec::new();
    for job in jobs {
        let JobStatus::Done(result) = &job.status else {
            continue;
        };
        let name = deduplicate(&suggested_filename(&job.name, result.format), &mut taken);
        let path = dir.join(name);
        fs::write(&path, &result.encoded).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(job = %job.id, path = %path.display(), bytes = result.byte_size, "result written");
        written.push(path);
    }
    Ok(written)
}
