//! # Execution Worker
//!
//! The per-worker control loop: dequeue, type-check, decode, resolve,
//! execute, respond.
//!
//! A request that fails to decode is dropped without a reply, because its
//! `reply_to` topic cannot be trusted. Every request that decodes gets
//! exactly one response, published from a single call site in
//! [`execute_command`].

use super::engine::EnvironmentLease;
use super::invocation::{CommandInvocation, WorkItem};
use super::outcome::{build_response, InvocationOutcome};
use super::queue::{QueueError, WorkQueue};
use crate::config::WorkerConfig;
use crate::logging::log_invocation;
use crate::messaging::{DecodeError, ExecutionRequest, ResponseStatus};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What happened to one dequeued item
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Dropped(DropReason),
    Replied {
        reply_to: String,
        status: ResponseStatus,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    /// Not an invocation at all
    Unrecognized,
    /// Invocation without a topic or payload
    MissingContext,
    Malformed(DecodeError),
    /// The response could not be encoded
    Unserializable,
}

/// Why a worker loop ended
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerExit {
    pub worker_id: Uuid,
    pub error: QueueError,
    pub processed: u64,
}

pub struct ExecutionWorker {
    id: Uuid,
    queue: Arc<dyn WorkQueue>,
    config: WorkerConfig,
}

impl ExecutionWorker {
    pub fn new(queue: Arc<dyn WorkQueue>, config: WorkerConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            queue,
            config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Run until the queue reports an error while not stopped
    pub async fn run(self) -> WorkerExit {
        info!(worker_id = %self.id, "Execution worker started");
        let mut processed: u64 = 0;

        loop {
            let item = match self.queue.dequeue().await {
                Ok(item) => item,
                Err(error) => {
                    if self.queue.is_stopped() {
                        tokio::time::sleep(self.config.dequeue_backoff).await;
                        continue;
                    }
                    error!(
                        worker_id = %self.id,
                        error = %error,
                        processed,
                        "Failed to dequeue request item, worker exiting"
                    );
                    return WorkerExit {
                        worker_id: self.id,
                        error,
                        processed,
                    };
                }
            };

            self.handle(item).await;
            processed += 1;
        }
    }

    /// Process one dequeued item
    pub async fn handle(&self, item: WorkItem) -> Disposition {
        let invocation = match item {
            WorkItem::Invocation(invocation) => invocation,
            WorkItem::Unrecognized { description } => {
                error!(
                    worker_id = %self.id,
                    item = %description,
                    "Dropping improperly queued request"
                );
                return Disposition::Dropped(DropReason::Unrecognized);
            }
        };

        if !invocation.has_context() {
            error!(
                worker_id = %self.id,
                topic = %invocation.topic,
                payload_bytes = invocation.payload.len(),
                "Dropping request without topic or payload"
            );
            return Disposition::Dropped(DropReason::MissingContext);
        }

        execute_command(&self.id.to_string(), &invocation, &self.config).await
    }
}

/// Decode, resolve, execute, and reply to one invocation
pub async fn execute_command(
    worker_id: &str,
    invocation: &CommandInvocation,
    config: &WorkerConfig,
) -> Disposition {
    let started = Instant::now();

    let request = match ExecutionRequest::decode(&invocation.payload) {
        Ok(request) => request,
        Err(e) => {
            error!(
                worker_id = %worker_id,
                topic = %invocation.topic,
                error = %e,
                "Ignoring malformed execution request"
            );
            return Disposition::Dropped(DropReason::Malformed(e));
        }
    };

    let outcome = resolve_and_execute(invocation, &request, config).await;
    let response = build_response(&outcome);

    let payload = match response.to_bytes() {
        Ok(payload) => payload,
        Err(e) => {
            error!(
                worker_id = %worker_id,
                reply_to = %request.reply_to,
                error = %e,
                "Failed to encode execution response"
            );
            return Disposition::Dropped(DropReason::Unserializable);
        }
    };

    invocation.publisher.publish(&request.reply_to, payload).await;

    log_invocation(
        worker_id,
        request.bundle_name(),
        request.pipeline_id(),
        &request.reply_to,
        outcome.label(),
        &response.status.to_string(),
        started.elapsed().as_millis() as u64,
    );

    Disposition::Replied {
        reply_to: request.reply_to,
        status: response.status,
    }
}

async fn resolve_and_execute(
    invocation: &CommandInvocation,
    request: &ExecutionRequest,
    config: &WorkerConfig,
) -> InvocationOutcome {
    if invocation.shutdown {
        debug!(
            reply_to = %request.reply_to,
            pipeline_id = %request.pipeline_id(),
            "Refusing request queued during shutdown"
        );
        return InvocationOutcome::ShuttingDown;
    }

    let name = request.bundle_name();
    let bundle = match request.version.as_deref() {
        Some(version) => invocation.catalog.find_str(name, version),
        None => invocation.catalog.find_latest(name),
    };

    let Some(bundle) = bundle else {
        warn!(
            bundle = %name,
            version = ?request.version,
            reply_to = %request.reply_to,
            "Unknown command bundle"
        );
        return InvocationOutcome::UnknownBundle {
            name: name.to_string(),
            version: request.version.clone(),
        };
    };

    let engine = match invocation.engines.engine_for_bundle(&bundle) {
        Ok(engine) => engine,
        Err(error) => {
            warn!(bundle = %bundle.key(), error = %error, "No engine for bundle");
            return InvocationOutcome::EngineUnavailable {
                bundle: bundle.name.clone(),
                error,
            };
        }
    };

    let lease =
        match EnvironmentLease::acquire(engine, request.pipeline_id(), Arc::clone(&bundle)).await {
            Ok(lease) => lease,
            Err(error) => {
                warn!(
                    bundle = %bundle.key(),
                    pipeline_id = %request.pipeline_id(),
                    error = %error,
                    "Failed to acquire execution environment"
                );
                return InvocationOutcome::EnvironmentUnavailable {
                    bundle: bundle.name.clone(),
                    error,
                };
            }
        };

    // The lease drops at the end of this function on every path,
    // returning the environment to its engine
    let outcome = match config.execution_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, lease.execute(request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(
                    bundle = %bundle.key(),
                    pipeline_id = %request.pipeline_id(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Command execution timed out"
                );
                return InvocationOutcome::TimedOut {
                    bundle: bundle.name.clone(),
                    timeout,
                };
            }
        },
        None => lease.execute(request).await,
    };

    InvocationOutcome::Executed {
        bundle: bundle.name.clone(),
        outcome,
    }
}
