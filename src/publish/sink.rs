//! Delivery sinks and the webhook wire format.
//!
//! The worker hands encoded payloads to a [`ReportSink`]. The production
//! sink posts to the configured webhook URL; tests substitute their own.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Delivery failures. Contained within the worker loop; never reach the
/// event-ingestion path.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("timeout after {0} seconds")]
    Timeout(u64),

    #[error("connection refused to {0}")]
    ConnectionRefused(String),

    #[error("webhook returned status {0}")]
    Status(u16),

    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The JSON document posted to the webhook.
///
/// `options` and `data` are nested JSON strings, not objects: the receiving
/// workflow decodes them a second time. This matches the wire format the
/// existing webhook workflows were built against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportPayload {
    /// Delivery time, ISO-8601.
    pub timestamp: String,

    /// User-supplied passthrough options, JSON-encoded.
    pub options: String,

    /// The Adaptive Card, JSON-encoded.
    pub data: String,
}

impl ReportPayload {
    /// Wrap an encoded card with the current timestamp and the configured
    /// passthrough options.
    pub fn new(card: &Value, options: &HashMap<String, String>) -> Result<Self, DeliveryError> {
        Ok(Self {
            timestamp: Utc::now().to_rfc3339(),
            options: serde_json::to_string(options)?,
            data: serde_json::to_string(card)?,
        })
    }
}

/// A report sink receives encoded payloads, one at a time.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one payload. Ordering and pacing are the worker's concern;
    /// implementations only perform the send.
    async fn deliver(&self, payload: &ReportPayload) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T: ReportSink + ?Sized> ReportSink for std::sync::Arc<T> {
    async fn deliver(&self, payload: &ReportPayload) -> Result<(), DeliveryError> {
        (**self).deliver(payload).await
    }
}

/// Sink that posts payloads to a collaboration webhook over HTTPS.
pub struct WebhookSink {
    client: Client,
    url: String,
    timeout_secs: u64,
}

impl WebhookSink {
    /// Build a sink for the given webhook URL.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(DeliveryError::Client)?;

        Ok(Self {
            client,
            url: url.into(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[async_trait]
impl ReportSink for WebhookSink {
    async fn deliver(&self, payload: &ReportPayload) -> Result<(), DeliveryError> {
        let body = serde_json::to_string(payload)?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    DeliveryError::ConnectionRefused(self.url.clone())
                } else {
                    DeliveryError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        debug!("webhook accepted report: {}", status.as_u16());
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Sinks for exercising the worker without a network.

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    /// Records every delivered payload; can fail the first N attempts and
    /// hold each send open for a configurable duration.
    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub delivered: Mutex<Vec<ReportPayload>>,
        times: Mutex<Vec<tokio::time::Instant>>,
        pub fail_first: AtomicUsize,
        pub send_duration: Option<Duration>,
        in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl RecordingSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_first(attempts: usize) -> Self {
            let sink = Self::default();
            sink.fail_first.store(attempts, Ordering::SeqCst);
            sink
        }

        pub fn with_send_duration(mut self, duration: Duration) -> Self {
            self.send_duration = Some(duration);
            self
        }

        pub fn delivered_titles(&self) -> Vec<String> {
            self.delivered
                .lock()
                .unwrap()
                .iter()
                .map(|p| {
                    let card: Value = serde_json::from_str(&p.data).unwrap();
                    card["body"][0]["items"][0]["text"]
                        .as_str()
                        .unwrap()
                        .to_string()
                })
                .collect()
        }

        pub fn delivered_count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }

        /// Start times of successful sends, in delivery order.
        pub fn delivery_times(&self) -> Vec<tokio::time::Instant> {
            self.times.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportSink for RecordingSink {
        async fn deliver(&self, payload: &ReportPayload) -> Result<(), DeliveryError> {
            let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
            let started = tokio::time::Instant::now();

            if let Some(duration) = self.send_duration {
                tokio::time::sleep(duration).await;
            }

            let result = if self
                .fail_first
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                Err(DeliveryError::Status(429))
            } else {
                self.delivered.lock().unwrap().push(payload.clone());
                self.times.lock().unwrap().push(started);
                Ok(())
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_nests_options_and_data_as_strings() {
        let mut options = HashMap::new();
        options.insert("branch".to_string(), "main".to_string());

        let card = json!({"type": "AdaptiveCard"});
        let payload = ReportPayload::new(&card, &options).unwrap();

        let body: Value = serde_json::to_value(&payload).unwrap();
        assert!(body["options"].is_string());
        assert!(body["data"].is_string());

        // Both round-trip through a second decode.
        let decoded_options: HashMap<String, String> =
            serde_json::from_str(body["options"].as_str().unwrap()).unwrap();
        assert_eq!(decoded_options["branch"], "main");

        let decoded_card: Value = serde_json::from_str(body["data"].as_str().unwrap()).unwrap();
        assert_eq!(decoded_card["type"], "AdaptiveCard");
    }

    #[test]
    fn test_payload_timestamp_is_iso8601() {
        let payload = ReportPayload::new(&json!({}), &HashMap::new()).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(&payload.timestamp).is_ok());
    }

    #[test]
    fn test_delivery_error_messages() {
        assert_eq!(
            DeliveryError::Status(503).to_string(),
            "webhook returned status 503"
        );
        assert_eq!(
            DeliveryError::Timeout(30).to_string(),
            "timeout after 30 seconds"
        );
    }
}
