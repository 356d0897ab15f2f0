//! Per-run outcome bookkeeping.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

/// One unit (a day or an input file) that could not be produced.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    pub unit: String,
    pub error: String,
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.unit, self.error)
    }
}

/// Counts and failures collected over one pipeline run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub written: usize,
    pub skipped: usize,
    /// Units whose f16 error exceeded the warning threshold (still written).
    pub precision_flagged: usize,
    /// Bytes of newly written containers.
    pub bytes_written: u64,
    pub failures: Vec<UnitFailure>,
}

impl BatchReport {
    pub fn record_written(&mut self, bytes: u64) {
        self.written += 1;
        self.bytes_written += bytes;
    }

    pub fn record_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, unit: impl Into<String>, error: impl fmt::Display) {
        let failure = UnitFailure {
            unit: unit.into(),
            error: error.to_string(),
        };
        warn!(unit = %failure.unit, error = %failure.error, "Unit failed");
        self.failures.push(failure);
    }

    /// Units that produced a container, new or existing.
    pub fn completed(&self) -> usize {
        self.written + self.skipped
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Log a one-line summary.
    pub fn log_summary(&self, pipeline: &str) {
        info!(
            pipeline,
            written = self.written,
            skipped = self.skipped,
            failed = self.failures.len(),
            precision_flagged = self.precision_flagged,
            mb_written = self.bytes_written as f64 / (1024.0 * 1024.0),
            "Run complete"
        );
    }
}

/// What a pipeline run left behind.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report: BatchReport,
    /// Manifest path, if anything was recorded.
    pub manifest: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let mut report = BatchReport::default();
        report.record_written(100);
        report.record_written(50);
        report.record_skipped();
        assert_eq!(report.completed(), 3);
        assert_eq!(report.bytes_written, 150);
        assert!(report.is_clean());

        report.record_failure("20110301", "first depth 0 m is not available");
        assert!(!report.is_clean());
        assert_eq!(
            report.failures[0].to_string(),
            "20110301: first depth 0 m is not available"
        );
    }
}
