//! suitecast: a webhook summary reporter for test runs.
//!
//! This crate rolls hierarchical test-execution events into per-root-suite
//! summaries and posts each one, encoded as an Adaptive Card, to a
//! collaboration webhook.
//!
//! # Architecture
//!
//! The main components are:
//!
//! - **Event model**: lifecycle events and the [`RunListener`] seam the
//!   host framework drives
//! - **Summary**: the per-root-suite record and the aggregator that owns
//!   its lifecycle
//! - **Publish**: the FIFO queue, the Adaptive Card encoder, and the
//!   rate-limited single-flight delivery worker
//! - **Reporter**: [`WebhookReporter`] wiring aggregation to delivery
//!
//! # Example
//!
//! ```no_run
//! use suitecast::{ReporterConfig, RunListener, WebhookReporter};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ReporterConfig {
//!         endpoint: Some("https://example.webhook.office.com/webhookb2/...".into()),
//!         ..ReporterConfig::default()
//!     };
//!     let mut reporter = WebhookReporter::new(config)?;
//!     // ... feed lifecycle events through the RunListener methods ...
//!     reporter.on_runner_end()?;
//!     reporter.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod event;
pub mod publish;
pub mod reporter;
pub mod summary;

// Re-export commonly used types
pub use config::{ReporterConfig, load_config, load_config_str};
pub use event::{RunEvent, RunListener, SuiteInfo, TestInfo, TestOutcome};
pub use publish::{DeliveryError, PublishQueue, ReportSink, WebhookSink};
pub use reporter::WebhookReporter;
pub use summary::{SuiteAggregator, SuiteError, SuiteMetrics, SummaryRecord};
