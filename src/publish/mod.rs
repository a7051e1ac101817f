//! Summary publishing: queue, payload encoding, and webhook delivery.

pub mod card;
pub mod sink;
pub mod worker;

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::summary::SummaryRecord;

pub use sink::{DeliveryError, ReportPayload, ReportSink, WebhookSink};
pub use worker::DeliveryWorker;

/// FIFO buffer of finalized summary records awaiting delivery.
///
/// The queue also carries the two flags the delivery worker coordinates
/// through: the `uploading` single-flight guard and the sticky
/// `producer_finished` signal. Records are removed only after a delivery
/// attempt completes, so a failure mid-attempt leaves the record at the
/// front and order is preserved.
#[derive(Default)]
pub struct PublishQueue {
    records: Mutex<VecDeque<SummaryRecord>>,
    uploading: AtomicBool,
    producer_finished: AtomicBool,
}

impl PublishQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finalized record.
    pub fn push(&self, record: SummaryRecord) {
        self.records.lock().unwrap().push_back(record);
    }

    /// Clone the front record without removing it.
    pub fn front(&self) -> Option<SummaryRecord> {
        self.records.lock().unwrap().front().cloned()
    }

    /// Remove and return the front record.
    pub fn pop(&self) -> Option<SummaryRecord> {
        self.records.lock().unwrap().pop_front()
    }

    /// Number of records waiting for delivery.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Whether no records are waiting.
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    /// Take the single-flight guard. Returns `false` if an upload is
    /// already in progress; at most one caller wins until [`end_upload`].
    ///
    /// [`end_upload`]: PublishQueue::end_upload
    pub fn begin_upload(&self) -> bool {
        self.uploading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the single-flight guard.
    pub fn end_upload(&self) {
        self.uploading.store(false, Ordering::SeqCst);
    }

    /// Whether a delivery is currently in progress.
    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    /// Record that the producer will enqueue nothing further. Sticky.
    pub fn finish_producer(&self) {
        self.producer_finished.store(true, Ordering::SeqCst);
    }

    /// Whether the producer has signaled completion.
    pub fn producer_finished(&self) -> bool {
        self.producer_finished.load(Ordering::SeqCst)
    }

    /// The externally observable "all work flushed" signal: the queue is
    /// empty and no delivery is in progress.
    pub fn is_drained(&self) -> bool {
        self.is_empty() && !self.is_uploading()
    }
}
