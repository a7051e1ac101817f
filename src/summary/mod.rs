//! Root-suite summary records and their metrics.
//!
//! A [`SummaryRecord`] is the unit of delivery: one per root suite, created
//! at suite start, mutated by test events while the suite is active, and
//! finalized exactly once at suite end. Finalized records are immutable.

pub mod aggregator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::TestOutcome;

pub use aggregator::SuiteAggregator;

/// Errors raised when the event stream violates the suite lifecycle.
///
/// These indicate an integration bug in the host framework (unpaired
/// start/end events), not a runtime fault, and are surfaced synchronously
/// to the caller of the violated operation.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("no active root suite")]
    NoActiveSuite,
}

/// Outcome counters for one root suite.
///
/// All counters are monotonically non-decreasing until the owning record is
/// finalized. `total` is derived once, at finalize time; it is zero (and
/// meaningless) before that.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteMetrics {
    /// Derived at finalize: `passed + failed - retried` (saturating).
    ///
    /// Skipped tests are excluded, and retries are subtracted so a test
    /// that failed and then passed on retry counts once.
    pub total: u64,
    /// Number of passed tests.
    pub passed: u64,
    /// Number of failed tests.
    pub failed: u64,
    /// Number of skipped tests.
    pub skipped: u64,
    /// Number of retried tests.
    pub retried: u64,
}

impl SuiteMetrics {
    /// Count one test outcome.
    pub fn record(&mut self, outcome: TestOutcome) {
        match outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed => self.failed += 1,
            TestOutcome::Skipped => self.skipped += 1,
            TestOutcome::Retried => self.retried += 1,
        }
    }

    fn finalize_total(&mut self) {
        self.total = (self.passed + self.failed).saturating_sub(self.retried);
    }
}

/// The finalized (or in-progress) result of one root suite's execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Root suite title.
    pub title: String,

    /// Outcome counters.
    pub metrics: SuiteMetrics,

    /// When the root suite started.
    pub start: DateTime<Utc>,

    /// When the root suite ended. `None` until the suite completes.
    pub end: Option<DateTime<Utc>>,
}

impl SummaryRecord {
    /// Create a fresh record with zeroed metrics.
    pub fn new(title: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            metrics: SuiteMetrics::default(),
            start,
            end: None,
        }
    }

    /// Set the end timestamp and derive the total. Called exactly once.
    pub(crate) fn finalize(&mut self, end: DateTime<Utc>) {
        self.end = Some(end);
        self.metrics.finalize_total();
    }

    /// Whether this record has been finalized and may be delivered.
    pub fn is_finalized(&self) -> bool {
        self.end.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_record_counts_each_outcome_once() {
        let mut metrics = SuiteMetrics::default();
        metrics.record(TestOutcome::Passed);
        metrics.record(TestOutcome::Passed);
        metrics.record(TestOutcome::Failed);
        metrics.record(TestOutcome::Skipped);
        metrics.record(TestOutcome::Retried);

        assert_eq!(metrics.passed, 2);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.skipped, 1);
        assert_eq!(metrics.retried, 1);
        // Total is not derived until finalize.
        assert_eq!(metrics.total, 0);
    }

    #[test]
    fn test_finalize_derives_total() {
        let mut record = SummaryRecord::new("Login Tests", start_time());
        record.metrics.record(TestOutcome::Passed);
        record.metrics.record(TestOutcome::Passed);
        record.metrics.record(TestOutcome::Passed);
        record.metrics.record(TestOutcome::Failed);
        record.metrics.record(TestOutcome::Retried);

        let end = start_time() + chrono::Duration::seconds(90);
        record.finalize(end);

        assert!(record.is_finalized());
        assert_eq!(record.end, Some(end));
        // 3 passed + 1 failed - 1 retried; skipped excluded.
        assert_eq!(record.metrics.total, 3);
    }

    #[test]
    fn test_total_excludes_skipped() {
        let mut record = SummaryRecord::new("Skips", start_time());
        record.metrics.record(TestOutcome::Passed);
        record.metrics.record(TestOutcome::Skipped);
        record.metrics.record(TestOutcome::Skipped);
        record.finalize(start_time());

        assert_eq!(record.metrics.total, 1);
        assert_eq!(record.metrics.skipped, 2);
    }

    #[test]
    fn test_total_saturates_at_zero() {
        // A degenerate stream can report more retries than completed tests.
        let mut record = SummaryRecord::new("Degenerate", start_time());
        record.metrics.record(TestOutcome::Retried);
        record.metrics.record(TestOutcome::Retried);
        record.metrics.record(TestOutcome::Passed);
        record.finalize(start_time());

        assert_eq!(record.metrics.total, 0);
    }
}
