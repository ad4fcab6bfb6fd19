//! Before/after size reporting.
//!
//! The report is derived data: it is recomputed from a job snapshot whenever
//! asked for and has no lifecycle of its own. Size totals and savings only
//! ever include `Done` jobs, so a failed or cancelled file never skews the
//! percentage.

use crate::imaging::{Dimensions, percent_saved};
use crate::job::{FailureReason, JobId, JobStatus, JobView};
use serde::Serialize;

/// Savings for one finished job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSavings {
    pub id: JobId,
    pub name: String,
    pub original_bytes: u64,
    pub result_bytes: u64,
    pub original_dimensions: Option<Dimensions>,
    pub result_dimensions: Dimensions,
    pub percent_saved: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub done: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_original_bytes: u64,
    pub total_result_bytes: u64,
    pub percent_saved: i64,
    /// One entry per `Done` job, in job order.
    pub per_job: Vec<JobSavings>,
}

impl AggregateReport {
    pub fn from_jobs(jobs: &[JobView]) -> Self {
        let mut report = Self {
            total: jobs.len(),
            ..Self::default()
        };

        for job in jobs {
            match &job.status {
                JobStatus::Pending => report.pending += 1,
                JobStatus::Processing => report.processing += 1,
                JobStatus::Failed(FailureReason::Cancelled) => report.cancelled += 1,
                JobStatus::Failed(_) => report.failed += 1,
                JobStatus::Done(result) => {
                    report.done += 1;
                    report.total_original_bytes += job.original_byte_size;
                    report.total_result_bytes += result.byte_size;
                    report.per_job.push(JobSavings {
                        id: job.id,
                        name: job.name.clone(),
                        original_bytes: job.original_byte_size,
                        result_bytes: result.byte_size,
                        original_dimensions: job.original_dimensions,
                        result_dimensions: result.dimensions,
                        percent_saved: percent_saved(job.original_byte_size, result.byte_size),
                    });
                }
            }
        }

        report.percent_saved = percent_saved(report.total_original_bytes, report.total_result_bytes);
        report
    }

    /// Every job has reached `Done` or `Failed`.
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::OutputFormat;
    use crate::job::JobResult;

    fn view(id: u64, original: u64, status: JobStatus) -> JobView {
        JobView {
            id: JobId(id),
            name: format!("{id}.png"),
            mime_type: "image/png".into(),
            original_byte_size: original,
            original_dimensions: Some(Dimensions::new(10, 10)),
            status,
        }
    }

    fn done(size: u64) -> JobStatus {
        JobStatus::Done(JobResult {
            encoded: vec![0; size as usize].into(),
            dimensions: Dimensions::new(5, 5),
            byte_size: size,
            format: OutputFormat::WebP,
        })
    }

    #[test]
    fn empty_batch() {
        let report = AggregateReport::from_jobs(&[]);
        assert_eq!(report, AggregateReport::default());
        assert!(report.is_settled());
    }

    #[test]
    fn totals_only_include_done_jobs() {
        let jobs = vec![
            view(1, 1000, done(250)),
            view(2, 1000, done(750)),
            view(3, 5000, JobStatus::Failed(FailureReason::Decode("bad".into()))),
            view(4, 9000, JobStatus::Failed(FailureReason::Cancelled)),
        ];
        let report = AggregateReport::from_jobs(&jobs);

        assert_eq!(report.total, 4);
        assert_eq!((report.done, report.failed, report.cancelled), (2, 1, 1));
        assert_eq!(report.total_original_bytes, 2000);
        assert_eq!(report.total_result_bytes, 1000);
        assert_eq!(report.percent_saved, 50);
        assert_eq!(
            report
                .per_job
                .iter()
                .map(|s| s.percent_saved)
                .collect::<Vec<_>>(),
            vec![75, 25]
        );
    }

    #[test]
    fn growth_is_negative_savings() {
        let report = AggregateReport::from_jobs(&[view(1, 100, done(150))]);
        assert_eq!(report.percent_saved, -50);
    }

    #[test]
    fn unsettled_jobs_are_counted_not_totalled() {
        let jobs = vec![
            view(1, 100, JobStatus::Pending),
            view(2, 100, JobStatus::Processing),
            view(3, 100, done(10)),
        ];
        let report = AggregateReport::from_jobs(&jobs);
        assert!(!report.is_settled());
        assert_eq!(report.total_original_bytes, 100);
        assert_eq!(report.percent_saved, 90);
    }

    #[test]
    fn serializes_for_json_output() {
        let report = AggregateReport::from_jobs(&[view(7, 200, done(100))]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["percent_saved"], 50);
        assert_eq!(json["per_job"][0]["id"], 7);
        assert_eq!(json["per_job"][0]["result_dimensions"]["width"], 5);
    }
}
