//! # Relay Error Types
//!
//! Crate-level error type for failures that span subsystems. Each subsystem
//! reports its own `thiserror` enum (`QueueError`, `EngineError`,
//! `DecodeError`, `ConfigurationError`, `VersionError`) directly from its
//! API; [`RelayError`] covers what only the worker pool can observe.

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Worker {worker_id} panicked: {message}")]
    WorkerPanicked { worker_id: Uuid, message: String },

    #[error("Worker {worker_id} was cancelled")]
    WorkerCancelled { worker_id: Uuid },
}

impl RelayError {
    pub fn from_join_error(worker_id: Uuid, error: tokio::task::JoinError) -> Self {
        if error.is_cancelled() {
            return Self::WorkerCancelled { worker_id };
        }

        let message = match error.try_into_panic() {
            Ok(payload) => payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".to_string()),
            Err(error) => error.to_string(),
        };
        Self::WorkerPanicked { worker_id, message }
    }

    pub fn worker_id(&self) -> Uuid {
        match self {
            Self::WorkerPanicked { worker_id, .. } | Self::WorkerCancelled { worker_id } => {
                *worker_id
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
