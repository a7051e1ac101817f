//! Inbound test-lifecycle event model.
//!
//! The host test framework drives the reporter through the [`RunListener`]
//! trait. Events can also be serialized as JSON Lines (one [`RunEvent`] per
//! line) and replayed later, which is how the CLI drives the pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::summary::SuiteError;

/// Stats carried by suite start/end events.
///
/// A suite is a *root suite* iff it has no parent identifier. Only root
/// suites produce summary records; nested suites contribute through their
/// test events alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteInfo {
    /// Suite title, used as the summary title for root suites.
    pub title: String,

    /// Title of the enclosing suite, absent (or empty) for root suites.
    #[serde(default)]
    pub parent: Option<String>,

    /// Source file the suite was defined in.
    pub file: PathBuf,

    /// When the suite started.
    pub start: DateTime<Utc>,

    /// When the suite ended. Only present on suite-end events.
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl SuiteInfo {
    /// Create suite stats for a root suite starting now-ish.
    pub fn new(title: impl Into<String>, file: impl Into<PathBuf>, start: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            parent: None,
            file: file.into(),
            start,
            end: None,
        }
    }

    /// Set the parent suite title.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the end timestamp.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Whether this suite has no parent and therefore anchors a summary.
    pub fn is_root(&self) -> bool {
        match &self.parent {
            None => true,
            Some(parent) => parent.is_empty(),
        }
    }
}

/// Stats carried by per-test events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestInfo {
    /// Test title.
    pub title: String,
}

impl TestInfo {
    /// Create test stats with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// Outcome of a single test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    /// Test passed.
    Passed,
    /// Test failed.
    Failed,
    /// Test was skipped.
    Skipped,
    /// Test was retried after a failure.
    Retried,
}

/// A single lifecycle event, as emitted by the host framework.
///
/// The serialized form is internally tagged so event logs stay readable:
///
/// ```json
/// {"type":"test_passed","title":"logs in with valid credentials"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A suite began executing.
    SuiteStart(SuiteInfo),
    /// A suite finished executing.
    SuiteEnd(SuiteInfo),
    /// A test passed.
    TestPassed(TestInfo),
    /// A test failed.
    TestFailed(TestInfo),
    /// A test was retried.
    TestRetried(TestInfo),
    /// A test was skipped.
    TestSkipped(TestInfo),
    /// The runner will emit no further events.
    RunnerEnd,
}

/// A run listener receives lifecycle events from the host test framework.
///
/// Handlers are synchronous and must never block: the reporter's delivery
/// work happens on a background task, not in the event path. Integration
/// errors (an event arriving with no active root suite) surface through the
/// returned [`SuiteError`].
pub trait RunListener {
    /// Called when a suite starts.
    fn on_suite_start(&mut self, suite: &SuiteInfo) -> Result<(), SuiteError>;

    /// Called when a suite ends.
    fn on_suite_end(&mut self, suite: &SuiteInfo) -> Result<(), SuiteError>;

    /// Called when a test passes.
    fn on_test_passed(&mut self, test: &TestInfo) -> Result<(), SuiteError>;

    /// Called when a test fails.
    fn on_test_failed(&mut self, test: &TestInfo) -> Result<(), SuiteError>;

    /// Called when a test is retried.
    fn on_test_retried(&mut self, test: &TestInfo) -> Result<(), SuiteError>;

    /// Called when a test is skipped.
    fn on_test_skipped(&mut self, test: &TestInfo) -> Result<(), SuiteError>;

    /// Called once the runner will emit no further events.
    fn on_runner_end(&mut self) -> Result<(), SuiteError>;

    /// Route a deserialized event to the matching handler.
    fn dispatch(&mut self, event: &RunEvent) -> Result<(), SuiteError> {
        match event {
            RunEvent::SuiteStart(suite) => self.on_suite_start(suite),
            RunEvent::SuiteEnd(suite) => self.on_suite_end(suite),
            RunEvent::TestPassed(test) => self.on_test_passed(test),
            RunEvent::TestFailed(test) => self.on_test_failed(test),
            RunEvent::TestRetried(test) => self.on_test_retried(test),
            RunEvent::TestSkipped(test) => self.on_test_skipped(test),
            RunEvent::RunnerEnd => self.on_runner_end(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_root_suite_detection() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let root = SuiteInfo::new("Login Tests", "login.spec.js", start);
        assert!(root.is_root());

        let nested = root.clone().with_parent("Login Tests");
        assert!(!nested.is_root());

        // An empty parent string counts as absent.
        let empty_parent = root.with_parent("");
        assert!(empty_parent.is_root());
    }

    #[test]
    fn test_run_event_round_trip() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let event = RunEvent::SuiteStart(SuiteInfo::new("Login Tests", "login.spec.js", start));

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"suite_start\""));

        let parsed: RunEvent = serde_json::from_str(&json).unwrap();
        match parsed {
            RunEvent::SuiteStart(suite) => {
                assert_eq!(suite.title, "Login Tests");
                assert_eq!(suite.start, start);
                assert!(suite.end.is_none());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_runner_end_tag() {
        let json = serde_json::to_string(&RunEvent::RunnerEnd).unwrap();
        assert_eq!(json, "{\"type\":\"runner_end\"}");

        let parsed: RunEvent = serde_json::from_str("{\"type\":\"runner_end\"}").unwrap();
        assert!(matches!(parsed, RunEvent::RunnerEnd));
    }

    #[test]
    fn test_test_event_payload() {
        let json = "{\"type\":\"test_failed\",\"title\":\"rejects bad password\"}";
        let parsed: RunEvent = serde_json::from_str(json).unwrap();
        match parsed {
            RunEvent::TestFailed(test) => assert_eq!(test.title, "rejects bad password"),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
