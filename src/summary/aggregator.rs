//! Root-suite lifecycle tracking.
//!
//! The aggregator owns at most one active [`SummaryRecord`] at a time. Root
//! suites open a record; nested and sibling suites are ignored while one is
//! active, so their tests bubble into the active record's metrics. Finished
//! records are returned to the caller for publishing and also kept in a
//! per-source-file history for later inspection.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use tracing::{debug, trace};

use crate::event::{SuiteInfo, TestOutcome};
use crate::summary::{SuiteError, SuiteMetrics, SummaryRecord};

struct ActiveSuite {
    record: SummaryRecord,
    group: String,
}

/// Tracks the active root suite and the history of finished ones.
///
/// Owned by the pipeline instance; there is no global state. All methods
/// are synchronous and cheap, so they are safe to call from the host
/// framework's event path.
#[derive(Default)]
pub struct SuiteAggregator {
    active: Option<ActiveSuite>,
    history: HashMap<String, Vec<SummaryRecord>>,
}

impl SuiteAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a suite-start event.
    ///
    /// The first root suite seen while none is active becomes the tracked
    /// one. Everything else is ignored here; nested suites are tracked only
    /// through their test events.
    pub fn on_suite_start(&mut self, suite: &SuiteInfo) {
        trace!("suite start: {}", suite.title);
        if !suite.is_root() || self.active.is_some() {
            return;
        }

        let group = group_key(&suite.file);
        self.history.entry(group.clone()).or_default();

        debug!("tracking root suite '{}' in group '{}'", suite.title, group);
        self.active = Some(ActiveSuite {
            record: SummaryRecord::new(suite.title.clone(), suite.start),
            group,
        });
    }

    /// Handle a suite-end event.
    ///
    /// Returns the finalized record when the ending suite closes the active
    /// root suite, `None` for nested suites. A root-suite end with no
    /// active suite means the event stream is malformed.
    pub fn on_suite_end(&mut self, suite: &SuiteInfo) -> Result<Option<SummaryRecord>, SuiteError> {
        if !suite.is_root() {
            return Ok(None);
        }

        let ActiveSuite { mut record, group } =
            self.active.take().ok_or(SuiteError::NoActiveSuite)?;
        record.finalize(suite.end.unwrap_or_else(Utc::now));

        debug!(
            "finalized root suite '{}': {} passed, {} failed, {} skipped, {} retried, total {}",
            record.title,
            record.metrics.passed,
            record.metrics.failed,
            record.metrics.skipped,
            record.metrics.retried,
            record.metrics.total,
        );

        self.history
            .entry(group)
            .or_default()
            .push(record.clone());
        Ok(Some(record))
    }

    /// Count one test outcome against the active root suite.
    pub fn record_outcome(&mut self, outcome: TestOutcome) -> Result<(), SuiteError> {
        let active = self.active.as_mut().ok_or(SuiteError::NoActiveSuite)?;
        active.record.metrics.record(outcome);
        Ok(())
    }

    /// The record currently being accumulated, if any.
    pub fn active(&self) -> Option<&SummaryRecord> {
        self.active.as_ref().map(|a| &a.record)
    }

    /// Metrics of the active root suite.
    pub fn metrics(&self) -> Result<&SuiteMetrics, SuiteError> {
        self.active
            .as_ref()
            .map(|a| &a.record.metrics)
            .ok_or(SuiteError::NoActiveSuite)
    }

    /// Finalized records grouped by source-file name, in completion order.
    pub fn history(&self) -> &HashMap<String, Vec<SummaryRecord>> {
        &self.history
    }
}

/// Group records by the file name of the suite's source file.
fn group_key(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string_lossy().into_owned())
}
