//! Download filenames for processed images.
//!
//! An output keeps its source's stem and takes the extension of its new
//! format:
//! - `holiday.jpeg` → `holiday.webp`
//! - `scan.final.TIFF` → `scan.final.png`
//! - `../etc/passwd` → `passwd.jpg`
//!
//! Names are only ever used as a final path component, so anything that
//! could climb directories or trip up a filesystem is replaced.

use crate::imaging::OutputFormat;
use std::collections::HashSet;

const FALLBACK_STEM: &str = "image";

/// `<stem>.<ext>` for an output derived from `original_name`.
pub fn suggested_filename(original_name: &str, format: OutputFormat) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let stem = match base.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => base,
    };
    let stem = sanitize(stem);
    let stem = if stem.is_empty() { FALLBACK_STEM } else { &stem };
    format!("{stem}.{}", format.extension())
}

fn sanitize(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    cleaned.trim().trim_matches('.').to_string()
}

/// Return `name`, or `name` with a `-N` suffix on its stem if already taken.
///
/// The returned name is recorded in `taken`.
pub fn deduplicate(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    };
    let mut n = 2;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        };
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
