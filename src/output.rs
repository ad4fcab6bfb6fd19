//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Intake
//!
//! ```text
//! Batch
//! 001 beach.png (3.1 MB)
//! 002 dusk.jpg (845.0 KB)
//!     Skipped notes.txt: unsupported file type
//!     Skipped photos/raw.jpg: unreadable
//!     Batch full: 2 files rejected (limit 20)
//! ```
//!
//! ## Processing
//!
//! ```text
//! Settings
//!     Output: WebP at quality 80
//!     Size: width 500, aspect locked
//! Processing 2 images
//!     #1 beach.png: 2000×2000 → 500×500, 3.1 MB → 41.2 KB (99% saved)
//!     #2 dusk.jpg: failed (decode error: ...)
//! ```
//!
//! ## Report
//!
//! ```text
//! 1 done, 1 failed, 0 cancelled
//! Total: 3.1 MB → 41.2 KB (99% saved)
//! ```
//!
//! A report taken while jobs are still queued or running adds a
//! `2 images still in progress` line.
//!
//! # Architecture
//!
//! Each stage has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::batch::{BatchConfiguration, BatchEvent, DispatchSummary, Intake};
use crate::imaging::percent_saved;
use crate::job::{FailureReason, JobStatus, JobView};
use crate::report::AggregateReport;
use std::path::PathBuf;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte count, 1024-based.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `(42% saved)` or `(grew 12%)`.
fn savings(percent: i64) -> String {
    if percent < 0 {
        format!("(grew {}%)", -percent)
    } else {
        format!("({}% saved)", percent)
    }
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{} {}", n, word)
    } else {
        format!("{} {}s", n, word)
    }
}

// ============================================================================
// Intake
// ============================================================================

pub fn format_intake(intake: &Intake) -> Vec<String> {
    let mut lines = vec!["Batch".to_string()];
    for (i, job) in intake.accepted.iter().enumerate() {
        lines.push(format!(
            "{} {} ({})",
            format_index(i + 1),
            job.name,
            format_bytes(job.original_byte_size)
        ));
    }
    for name in &intake.unsupported {
        lines.push(format!("{}Skipped {}: unsupported file type", indent(1), name));
    }
    for name in &intake.unreadable {
        lines.push(format!("{}Skipped {}: unreadable", indent(1), name));
    }
    if let Some(notice) = intake.capacity_exceeded {
        lines.push(format!(
            "{}Batch full: {} rejected (limit {})",
            indent(1),
            plural(notice.rejected, "file"),
            notice.capacity
        ));
    }
    lines
}

pub fn print_intake(intake: &Intake) {
    for line in format_intake(intake) {
        println!("{}", line);
    }
}

// ============================================================================
// Processing
// ============================================================================

/// The configuration a dispatch will apply.
pub fn format_settings(config: &BatchConfiguration) -> Vec<String> {
    let output = if config.format.uses_quality() {
        format!("{} at quality {}", config.format, config.quality.value())
    } else {
        format!("{} (quality ignored)", config.format)
    };
    let size = match (config.width, config.height) {
        (None, None) => "original".to_string(),
        (Some(w), None) => format!("width {}", w),
        (None, Some(h)) => format!("height {}", h),
        (Some(w), Some(h)) => format!("{}×{}", w, h),
    };
    let aspect = if config.lock_aspect && (config.width.is_some() || config.height.is_some()) {
        ", aspect locked"
    } else {
        ""
    };

    let mut lines = vec![
        "Settings".to_string(),
        format!("{}Output: {}", indent(1), output),
        format!("{}Size: {}{}", indent(1), size, aspect),
    ];
    if let Some(wm) = &config.watermark {
        lines.push(format!(
            "{}Watermark: {}% wide, {}% opacity",
            indent(1),
            wm.scale_percent,
            (wm.opacity * 100.0).round()
        ));
    }
    lines
}

pub fn print_settings(config: &BatchConfiguration) {
    for line in format_settings(config) {
        println!("{}", line);
    }
}

/// One line describing where a job ended up.
pub fn format_job_line(job: &JobView) -> String {
    let detail = match &job.status {
        JobStatus::Done(result) => {
            let from = job
                .original_dimensions
                .map(|d| format!("{} → ", d))
                .unwrap_or_default();
            format!(
                "{}{}, {} → {} {}",
                from,
                result.dimensions,
                format_bytes(job.original_byte_size),
                format_bytes(result.byte_size),
                savings(percent_saved(job.original_byte_size, result.byte_size))
            )
        }
        JobStatus::Failed(FailureReason::Cancelled) => "cancelled".to_string(),
        JobStatus::Failed(reason) => format!("failed ({})", reason),
        status => status.label().to_string(),
    };
    format!("{}: {}", job.name, detail)
}

/// Format a single dispatch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::DispatchStarted { job_count } => {
            vec![format!("Processing {}", plural(*job_count, "image"))]
        }
        BatchEvent::JobStarted { .. } => Vec::new(),
        BatchEvent::JobSettled(job) => {
            vec![format!("{}{} {}", indent(1), job.id, format_job_line(job))]
        }
        BatchEvent::DispatchFinished(summary) => vec![format_summary(summary)],
    }
}

fn format_summary(summary: &DispatchSummary) -> String {
    format!(
        "{} done, {} failed, {} cancelled",
        summary.done, summary.failed, summary.cancelled
    )
}

// ============================================================================
// Report
// ============================================================================

pub fn format_report(report: &AggregateReport) -> Vec<String> {
    let mut lines = vec![format!(
        "{} done, {} failed, {} cancelled",
        report.done, report.failed, report.cancelled
    )];
    if report.done > 0 {
        lines.push(format!(
            "Total: {} → {} {}",
            format_bytes(report.total_original_bytes),
            format_bytes(report.total_result_bytes),
            savings(report.percent_saved)
        ));
    }
    if !report.is_settled() {
        lines.push(format!(
            "{} still in progress",
            plural(report.pending + report.processing, "image")
        ));
    }
    lines
}

pub fn print_report(report: &AggregateReport) {
    for line in format_report(report) {
        println!("{}", line);
    }
}

pub fn format_written(paths: &[PathBuf]) -> Vec<String> {
    let mut lines = vec![format!("Wrote {}", plural(paths.len(), "file"))];
    lines.extend(
        paths
            .iter()
            .map(|p| format!("{}{}", indent(1), p.display())),
    );
    lines
}

pub fn print_written(paths: &[PathBuf]) {
    for line in format_written(paths) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{CapacityExceeded, WatermarkSpec};
    use crate::imaging::{Anchor, Dimensions, OutputFormat, Quality};
    use crate::job::{JobId, JobResult};

    fn view(status: JobStatus) -> JobView {
        JobView {
            id: JobId(3),
            name: "beach.png".into(),
            mime_type: "image/png".into(),
            original_byte_size: 4096,
            original_dimensions: Some(Dimensions::new(2000, 2000)),
            status,
        }
    }

    fn done(bytes: u64) -> JobStatus {
        JobStatus::Done(JobResult {
            encoded: vec![0; bytes as usize].into(),
            dimensions: Dimensions::new(500, 500),
            byte_size: bytes,
            format: OutputFormat::WebP,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(20), "020");
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn savings_sign() {
        assert_eq!(savings(42), "(42% saved)");
        assert_eq!(savings(0), "(0% saved)");
        assert_eq!(savings(-12), "(grew 12%)");
    }

    // =========================================================================
    // Intake
    // =========================================================================

    #[test]
    fn intake_lists_accepted_and_notices() {
        let intake = Intake {
            accepted: vec![view(JobStatus::Pending)],
            unsupported: vec!["notes.txt".into()],
            unreadable: vec!["raw/gone.jpg".into()],
            capacity_exceeded: Some(CapacityExceeded {
                rejected: 2,
                capacity: 20,
            }),
        };
        assert_eq!(
            format_intake(&intake),
            vec![
                "Batch",
                "001 beach.png (4.0 KB)",
                "    Skipped notes.txt: unsupported file type",
                "    Skipped raw/gone.jpg: unreadable",
                "    Batch full: 2 files rejected (limit 20)",
            ]
        );
    }

    #[test]
    fn intake_single_rejection_is_singular() {
        let intake = Intake {
            capacity_exceeded: Some(CapacityExceeded {
                rejected: 1,
                capacity: 20,
            }),
            ..Intake::default()
        };
        assert_eq!(format_intake(&intake)[1], "    Batch full: 1 file rejected (limit 20)");
    }

    // =========================================================================
    // Processing
    // =========================================================================

    #[test]
    fn settings_for_lossy_format_show_quality() {
        let config = BatchConfiguration {
            width: Some(500),
            format: OutputFormat::WebP,
            quality: Quality::new(75),
            ..BatchConfiguration::default()
        };
        assert_eq!(
            format_settings(&config),
            vec![
                "Settings",
                "    Output: WebP at quality 75",
                "    Size: width 500, aspect locked"
            ]
        );
    }

    #[test]
    fn settings_for_png_say_quality_is_ignored() {
        let config = BatchConfiguration {
            width: Some(300),
            height: Some(200),
            lock_aspect: false,
            format: OutputFormat::Png,
            quality: Quality::new(10),
            watermark: Some(WatermarkSpec {
                image: vec![0].into(),
                opacity: 0.5,
                scale_percent: 20.0,
                anchor: Anchor::BottomRight,
                padding: 20,
            }),
        };
        assert_eq!(
            format_settings(&config),
            vec![
                "Settings",
                "    Output: PNG (quality ignored)",
                "    Size: 300×200",
                "    Watermark: 20% wide, 50% opacity"
            ]
        );
    }

    #[test]
    fn settings_without_resize_keep_original_size() {
        let lines = format_settings(&BatchConfiguration::default());
        assert_eq!(lines[2], "    Size: original");
    }

    #[test]
    fn job_line_done() {
        assert_eq!(
            format_job_line(&view(done(1024))),
            "beach.png: 2000×2000 → 500×500, 4.0 KB → 1.0 KB (75% saved)"
        );
    }

    #[test]
    fn job_line_failed_shows_reason() {
        let line = format_job_line(&view(JobStatus::Failed(FailureReason::Decode(
            "bad header".into(),
        ))));
        assert_eq!(line, "beach.png: failed (decode error: bad header)");
    }

    #[test]
    fn job_line_cancelled() {
        let line = format_job_line(&view(JobStatus::Failed(FailureReason::Cancelled)));
        assert_eq!(line, "beach.png: cancelled");
    }

    #[test]
    fn settled_event_is_indented_with_id() {
        let lines = format_batch_event(&BatchEvent::JobSettled(view(done(1024))));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("    #3 beach.png: "));
    }

    #[test]
    fn started_events() {
        assert_eq!(
            format_batch_event(&BatchEvent::DispatchStarted { job_count: 1 }),
            vec!["Processing 1 image"]
        );
        assert!(
            format_batch_event(&BatchEvent::JobStarted {
                id: JobId(1),
                name: "a.png".into()
            })
            .is_empty()
        );
    }

    // =========================================================================
    // Report
    // =========================================================================

    #[test]
    fn report_with_done_jobs() {
        let report = AggregateReport::from_jobs(&[
            view(done(1024)),
            view(JobStatus::Failed(FailureReason::Encode("x".into()))),
        ]);
        assert_eq!(
            format_report(&report),
            vec![
                "1 done, 1 failed, 0 cancelled",
                "Total: 4.0 KB → 1.0 KB (75% saved)"
            ]
        );
    }

    #[test]
    fn report_without_done_jobs_omits_totals() {
        let report =
            AggregateReport::from_jobs(&[view(JobStatus::Failed(FailureReason::Cancelled))]);
        assert_eq!(format_report(&report), vec!["0 done, 0 failed, 1 cancelled"]);
    }

    #[test]
    fn report_taken_mid_dispatch_notes_unsettled_jobs() {
        let report = AggregateReport::from_jobs(&[
            view(done(1024)),
            view(JobStatus::Processing),
            view(JobStatus::Pending),
        ]);
        assert_eq!(
            format_report(&report),
            vec![
                "1 done, 0 failed, 0 cancelled",
                "Total: 4.0 KB → 1.0 KB (75% saved)",
                "2 images still in progress"
            ]
        );
    }

    #[test]
    fn written_paths() {
        let lines = format_written(&[PathBuf::from("out/a.webp")]);
        assert_eq!(lines, vec!["Wrote 1 file", "    out/a.webp"]);
    }
}
