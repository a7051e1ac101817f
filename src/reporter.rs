//! The webhook reporter: aggregation wired to background delivery.
//!
//! [`WebhookReporter`] implements [`RunListener`] for the host framework.
//! Event handlers are synchronous and never block; all network work happens
//! on the delivery worker task. With no endpoint configured the worker is
//! never spawned and the reporter aggregates locally, which keeps the
//! pipeline usable for offline runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::ReporterConfig;
use crate::event::{RunListener, SuiteInfo, TestInfo, TestOutcome};
use crate::publish::{DeliveryError, DeliveryWorker, PublishQueue, ReportSink, WebhookSink};
use crate::summary::{SuiteAggregator, SuiteError, SummaryRecord};

/// Aggregates test events and publishes per-root-suite summaries.
pub struct WebhookReporter {
    aggregator: SuiteAggregator,
    queue: Arc<PublishQueue>,
    nudge: Arc<Notify>,
    worker: Option<JoinHandle<()>>,
    delivery_enabled: bool,
}

impl WebhookReporter {
    /// Build a reporter from configuration, spawning the delivery worker
    /// when an endpoint is configured.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ReporterConfig) -> Result<Self, DeliveryError> {
        match &config.endpoint {
            Some(endpoint) => {
                let sink = WebhookSink::new(endpoint.clone(), config.request_timeout())?;
                Ok(Self::with_sink(config, sink))
            }
            None => {
                debug!("no endpoint configured, delivery disabled");
                Ok(Self::disabled())
            }
        }
    }

    /// Build a reporter that delivers through the given sink.
    ///
    /// This is the seam for alternative destinations and for tests.
    pub fn with_sink<S: ReportSink + 'static>(config: ReporterConfig, sink: S) -> Self {
        let queue = Arc::new(PublishQueue::new());
        let nudge = Arc::new(Notify::new());

        let worker = DeliveryWorker::new(queue.clone(), Arc::new(sink), nudge.clone(), &config);
        let handle = tokio::spawn(worker.run());

        Self {
            aggregator: SuiteAggregator::new(),
            queue,
            nudge,
            worker: Some(handle),
            delivery_enabled: true,
        }
    }

    /// Build a reporter that aggregates but never delivers.
    pub fn disabled() -> Self {
        Self {
            aggregator: SuiteAggregator::new(),
            queue: Arc::new(PublishQueue::new()),
            nudge: Arc::new(Notify::new()),
            worker: None,
            delivery_enabled: false,
        }
    }

    /// Whether summaries are being posted anywhere.
    pub fn delivery_enabled(&self) -> bool {
        self.delivery_enabled
    }

    /// Finalized records grouped by source-file name.
    pub fn history(&self) -> &HashMap<String, Vec<SummaryRecord>> {
        self.aggregator.history()
    }

    /// True when every finished summary has been flushed: the publish
    /// queue is empty and no send is in progress.
    pub fn is_drained(&self) -> bool {
        self.queue.is_drained()
    }

    /// Poll the drained predicate until it holds. The watchdog for
    /// process-exit paths; pair with [`on_runner_end`].
    ///
    /// [`on_runner_end`]: RunListener::on_runner_end
    pub async fn wait_until_drained(&self) {
        while !self.is_drained() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    /// Signal the producer is done and wait for the worker to flush the
    /// queue and stop.
    pub async fn shutdown(&mut self) {
        self.queue.finish_producer();
        self.nudge.notify_one();

        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                error!("delivery worker task failed: {}", err);
            }
        }
    }

    fn record_outcome(&mut self, outcome: TestOutcome) -> Result<(), SuiteError> {
        self.aggregator.record_outcome(outcome)
    }
}

impl RunListener for WebhookReporter {
    fn on_suite_start(&mut self, suite: &SuiteInfo) -> Result<(), SuiteError> {
        self.aggregator.on_suite_start(suite);
        Ok(())
    }

    fn on_suite_end(&mut self, suite: &SuiteInfo) -> Result<(), SuiteError> {
        if let Some(record) = self.aggregator.on_suite_end(suite)? {
            if self.delivery_enabled {
                self.queue.push(record);
                self.nudge.notify_one();
            }
        }
        Ok(())
    }

    fn on_test_passed(&mut self, test: &TestInfo) -> Result<(), SuiteError> {
        debug!("test passed: {}", test.title);
        self.record_outcome(TestOutcome::Passed)
    }

    fn on_test_failed(&mut self, test: &TestInfo) -> Result<(), SuiteError> {
        debug!("test failed: {}", test.title);
        self.record_outcome(TestOutcome::Failed)
    }

    fn on_test_retried(&mut self, test: &TestInfo) -> Result<(), SuiteError> {
        debug!("test retried: {}", test.title);
        self.record_outcome(TestOutcome::Retried)
    }

    fn on_test_skipped(&mut self, test: &TestInfo) -> Result<(), SuiteError> {
        println!("{}", style(format!("SKIPPED {}", test.title)).yellow().bold());
        self.record_outcome(TestOutcome::Skipped)
    }

    fn on_runner_end(&mut self) -> Result<(), SuiteError> {
        debug!("runner finished, draining publish queue");
        self.queue.finish_producer();
        self.nudge.notify_one();
        Ok(())
    }
}
