//! Background delivery worker.
//!
//! One worker task drains the publish queue: exactly one send in flight,
//! FIFO order, a fixed pause after every send. It wakes on a periodic
//! interval and on enqueue nudges, and exits permanently once the producer
//! has finished and the queue is empty.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ReporterConfig;
use crate::publish::sink::{ReportPayload, ReportSink};
use crate::publish::{PublishQueue, card};
use crate::summary::SummaryRecord;

/// Drains the publish queue to a [`ReportSink`].
pub struct DeliveryWorker<S> {
    queue: Arc<PublishQueue>,
    sink: Arc<S>,
    nudge: Arc<Notify>,
    interval: Duration,
    rate_limit: Duration,
    max_attempts: u32,
    retry_backoff: Duration,
    payload_options: HashMap<String, String>,
}

impl<S: ReportSink> DeliveryWorker<S> {
    /// Create a worker over the shared queue and nudge channel.
    pub fn new(
        queue: Arc<PublishQueue>,
        sink: Arc<S>,
        nudge: Arc<Notify>,
        config: &ReporterConfig,
    ) -> Self {
        Self {
            queue,
            sink,
            nudge,
            interval: config.interval(),
            rate_limit: config.rate_limit(),
            max_attempts: config.max_attempts.max(1),
            retry_backoff: config.retry_backoff(),
            payload_options: config.payload_options.clone(),
        }
    }

    /// Run until the producer has finished and the queue is empty.
    ///
    /// Both trigger sources (interval tick, enqueue nudge) feed the same
    /// drain routine; a nudge arriving mid-drain is absorbed by the
    /// single-flight guard.
    pub async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("delivery worker started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.nudge.notified() => {}
            }

            if self.queue.producer_finished() && self.queue.is_empty() {
                break;
            }

            self.drain().await;

            // Re-check so the last record does not wait out another tick.
            if self.queue.producer_finished() && self.queue.is_empty() {
                break;
            }
        }
        info!("delivery worker stopped");
    }

    /// Drain the queue sequentially. Safe under concurrent triggers: the
    /// single-flight guard admits one drainer and the rest return at once.
    pub(crate) async fn drain(&self) {
        if self.queue.is_empty() || !self.queue.begin_upload() {
            return;
        }

        debug!("draining publish queue ({} pending)", self.queue.len());
        while let Some(record) = self.queue.front() {
            self.deliver_with_retry(&record).await;
            // Removed only after the attempt sequence completes, success
            // or not, so an in-progress record stays at the front.
            self.queue.pop();
            // The pause is charged per item, putting a floor on
            // inter-request spacing regardless of trigger frequency.
            time::sleep(self.rate_limit).await;
        }
        self.queue.end_upload();
        debug!("publish queue drained");
    }

    async fn deliver_with_retry(&self, record: &SummaryRecord) {
        let card = card::encode(record);
        let mut backoff = self.retry_backoff;

        for attempt in 1..=self.max_attempts {
            let payload = match ReportPayload::new(&card, &self.payload_options) {
                Ok(payload) => payload,
                Err(err) => {
                    error!("dropping summary for '{}': {}", record.title, err);
                    return;
                }
            };

            match self.sink.deliver(&payload).await {
                Ok(()) => {
                    debug!("delivered summary for '{}'", record.title);
                    return;
                }
                Err(err) if attempt < self.max_attempts => {
                    warn!(
                        "delivery attempt {} for '{}' failed: {}",
                        attempt, record.title, err
                    );
                    time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(err) => {
                    error!(
                        "dropping summary for '{}' after {} attempts: {}",
                        record.title, attempt, err
                    );
                }
            }
        }
    }
}
