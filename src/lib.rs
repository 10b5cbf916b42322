#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Command Relay
//!
//! Execution relay core for a distributed command-dispatch platform.
//!
//! ## Overview
//!
//! Remote clients publish "execute this command bundle" requests on a
//! message bus. The dispatch layer wraps each one in a
//! [`CommandInvocation`](execution::CommandInvocation) and queues it; a pool
//! of [`ExecutionWorker`](execution::ExecutionWorker)s drains the queue,
//! resolves the bundle in the [`BundleCatalog`](bundle::BundleCatalog),
//! hands the command to the bundle's engine, and publishes a response to the
//! request's `reply_to` topic.
//!
//! ## Module Organization
//!
//! - [`bundle`] - Bundles, semantic versions, and the concurrent catalog
//! - [`messaging`] - Request/response wire formats and the publisher seam
//! - [`execution`] - Work queue, engines, worker loop, and worker pool
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Crate-level error type
//!
//! ## Quick Start
//!
//! ```rust
//! use command_relay::bundle::{Bundle, BundleCatalog};
//! use command_relay::config::WorkerConfig;
//! use command_relay::execution::{CommandInvocation, EngineRegistry, MemoryWorkQueue, WorkerPool};
//! use command_relay::messaging::BroadcastPublisher;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let catalog = Arc::new(BundleCatalog::new());
//! catalog.add(Bundle::new("ops", "1.0.0", "native").unwrap());
//!
//! let engines = Arc::new(EngineRegistry::new());
//! let publisher = Arc::new(BroadcastPublisher::default());
//! let queue = Arc::new(MemoryWorkQueue::new());
//! let pool = WorkerPool::spawn(2, WorkerConfig::default(), queue.clone());
//!
//! let payload = br#"{"bundle_name": "ops", "reply_to": "replies.1"}"#.to_vec();
//! let invocation = CommandInvocation::new("commands", payload, catalog, engines, publisher);
//! queue.enqueue(invocation.into()).unwrap();
//!
//! queue.close();
//! pool.join().await.unwrap();
//! # }
//! ```

pub mod bundle;
pub mod config;
pub mod error;
pub mod execution;
pub mod logging;
pub mod messaging;

pub use bundle::{Bundle, BundleCatalog, BundleVersion};
pub use config::{RelayConfig, WorkerConfig};
pub use error::{RelayError, Result};
