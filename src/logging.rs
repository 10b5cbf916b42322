//! # Structured Logging Module
//!
//! Environment-aware structured logging for the relay workers.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging once per process.
///
/// `RUST_LOG` wins when set; otherwise the level follows `RELAY_ENV`.
/// `RELAY_LOG_FORMAT=json` switches the console output to JSON lines.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json = std::env::var("RELAY_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // A global subscriber may already exist (embedding application, tests)
        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
            return;
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json,
            "Structured logging initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var("RELAY_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log one completed invocation
pub fn log_invocation(
    worker_id: &str,
    bundle: &str,
    pipeline_id: &str,
    reply_to: &str,
    outcome: &str,
    status: &str,
    duration_ms: u64,
) {
    tracing::info!(
        worker_id = %worker_id,
        bundle = %bundle,
        pipeline_id = %pipeline_id,
        reply_to = %reply_to,
        outcome = %outcome,
        status = %status,
        duration_ms,
        timestamp = %Utc::now().to_rfc3339(),
        "COMMAND_INVOCATION"
    );
}
