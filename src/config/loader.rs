//! Configuration Loader
//!
//! Merges defaults, an optional configuration file, and environment
//! overrides using the `config` crate, then validates the result.

use super::error::{ConfigResult, ConfigurationError};
use super::RelayConfig;
use config::{Config, Environment, File};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

pub const ENV_PREFIX: &str = "RELAY";
pub const ENV_SEPARATOR: &str = "__";

impl RelayConfig {
    /// Load from `path` (if given) and the process environment
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_from_sources(path, None)
    }

    /// Load from `path` (if given) and an explicit environment map.
    ///
    /// Passing `Some(vars)` replaces the process environment, which keeps
    /// tests independent of global state.
    pub fn load_from_sources(
        path: Option<&Path>,
        env_vars: Option<HashMap<String, String>>,
    ) -> ConfigResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigurationError::file_not_found(
                    path.display().to_string(),
                ));
            }
            debug!(path = %path.display(), "Loading relay configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(env_vars),
        );

        let config: RelayConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        info!(
            pool_size = config.worker.pool_size,
            dequeue_backoff_ms = config.worker.dequeue_backoff_ms,
            execution_timeout_ms = ?config.worker.execution_timeout_ms,
            queue_capacity = ?config.queue.capacity,
            "Relay configuration loaded"
        );

        Ok(config)
    }
}
