//! # Relay Configuration
//!
//! Layered configuration: built-in defaults, then an optional TOML/YAML/JSON
//! file, then `RELAY_`-prefixed environment variables using `__` between
//! section and key (`RELAY_WORKER__POOL_SIZE=8`).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use command_relay::config::RelayConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RelayConfig::load(Some(Path::new("config/relay.toml")))?;
//! let workers = config.worker.pool_size;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    pub worker: WorkerSettings,
    pub queue: QueueSettings,
    pub publisher: PublisherSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Number of execution workers
    pub pool_size: usize,
    /// Pause between dequeue attempts while the queue is stopped
    pub dequeue_backoff_ms: u64,
    /// Upper bound on a single command run; unbounded when absent
    pub execution_timeout_ms: Option<u64>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            dequeue_backoff_ms: 50,
            execution_timeout_ms: None,
        }
    }
}

fn default_pool_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Maximum queued items; unbounded when absent
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PublisherSettings {
    pub channel_capacity: usize,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 1000,
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.worker.pool_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "worker.pool_size",
                "0",
                "at least one worker is required",
            ));
        }

        if !(1..=10_000).contains(&self.worker.dequeue_backoff_ms) {
            return Err(ConfigurationError::invalid_value(
                "worker.dequeue_backoff_ms",
                self.worker.dequeue_backoff_ms.to_string(),
                "must be between 1 and 10000",
            ));
        }

        if self.worker.execution_timeout_ms == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "worker.execution_timeout_ms",
                "0",
                "must be positive when set",
            ));
        }

        if self.queue.capacity == Some(0) {
            return Err(ConfigurationError::invalid_value(
                "queue.capacity",
                "0",
                "must be positive when set",
            ));
        }

        if self.publisher.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "publisher.channel_capacity",
                "0",
                "must be positive",
            ));
        }

        Ok(())
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::from(&self.worker)
    }
}

/// Runtime settings handed to each execution worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerConfig {
    pub dequeue_backoff: Duration,
    pub execution_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig::from(&WorkerSettings::default())
    }
}

impl From<&WorkerSettings> for WorkerConfig {
    fn from(settings: &WorkerSettings) -> Self {
        Self {
            dequeue_backoff: Duration::from_millis(settings.dequeue_backoff_ms),
            execution_timeout: settings.execution_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.worker.pool_size >= 1);
        assert_eq!(config.worker.dequeue_backoff_ms, 50);
        assert_eq!(config.publisher.channel_capacity, 1000);
    }

    #[test]
    fn test_validation_rejects_zero_values() {
        let mut config = RelayConfig::default();
        config.worker.pool_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "worker.pool_size"
        ));

        let mut config = RelayConfig::default();
        config.worker.execution_timeout_ms = Some(0);
        assert!(config.validate().is_err());

        let mut config = RelayConfig::default();
        config.worker.dequeue_backoff_ms = 60_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_worker_config_conversion() {
        let mut config = RelayConfig::default();
        config.worker.dequeue_backoff_ms = 25;
        config.worker.execution_timeout_ms = Some(1500);

        let worker = config.worker_config();
        assert_eq!(worker.dequeue_backoff, Duration::from_millis(25));
        assert_eq!(worker.execution_timeout, Some(Duration::from_millis(1500)));
    }
}
