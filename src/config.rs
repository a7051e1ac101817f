//! Configuration loading and schema for the reporter.
//!
//! Configuration is flat TOML. Only `endpoint` matters for enabling
//! delivery; everything else has defaults tuned for rate-limited
//! collaboration webhooks.
//!
//! ```toml
//! endpoint = "https://example.webhook.office.com/webhookb2/..."
//! interval_ms = 5000
//! rate_limit_ms = 1000
//!
//! [payload_options]
//! branch = "main"
//! pipeline = "nightly"
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Reporter settings.
///
/// # Defaults
///
/// | Field | Default |
/// |-------|---------|
/// | `endpoint` | unset (delivery disabled) |
/// | `interval_ms` | 5000 |
/// | `rate_limit_ms` | 1000 |
/// | `max_attempts` | 3 |
/// | `retry_backoff_ms` | 500 |
/// | `request_timeout_secs` | 30 |
/// | `payload_options` | empty |
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReporterConfig {
    /// Destination webhook URL. When unset, delivery is disabled and the
    /// reporter only aggregates; no HTTP request is ever issued.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Recurring drain-trigger period in milliseconds.
    ///
    /// The delivery worker wakes at this interval even without fresh
    /// enqueues, so summaries left behind by a missed nudge still go out.
    ///
    /// Default: 5000
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Pause after each delivered item in milliseconds.
    ///
    /// Collaboration webhooks throttle bursty senders; this enforces a
    /// floor on inter-request spacing.
    ///
    /// Default: 1000
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Delivery attempts per record before it is dropped.
    ///
    /// Values below 1 are treated as 1.
    ///
    /// Default: 3
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base pause between attempts in milliseconds, doubled per attempt.
    ///
    /// Default: 500
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// HTTP request timeout in seconds.
    ///
    /// Default: 30
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Opaque string map echoed in every payload's `options` field.
    #[serde(default)]
    pub payload_options: HashMap<String, String>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            interval_ms: default_interval_ms(),
            rate_limit_ms: default_rate_limit_ms(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            payload_options: HashMap::new(),
        }
    }
}

impl ReporterConfig {
    /// Drain-trigger period as a [`Duration`].
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Per-item delivery pause as a [`Duration`].
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }

    /// Base retry backoff as a [`Duration`].
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// HTTP request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ReporterConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: ReporterConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

/// Load configuration from a string.
pub fn load_config_str(content: &str) -> Result<ReporterConfig> {
    let config: ReporterConfig = toml::from_str(content).context("Failed to parse config")?;

    Ok(config)
}
