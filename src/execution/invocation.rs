//! Typed work items handed from the dispatch layer to the workers.

use super::engine::EngineResolver;
use crate::bundle::BundleCatalog;
use crate::messaging::MessagePublisher;
use std::fmt;
use std::sync::Arc;

/// One "execute this bundle command" request received from the bus
#[derive(Clone)]
pub struct CommandInvocation {
    /// Topic the request arrived on
    pub topic: String,
    /// Undecoded request body
    pub payload: Vec<u8>,
    pub catalog: Arc<BundleCatalog>,
    pub engines: Arc<dyn EngineResolver>,
    pub publisher: Arc<dyn MessagePublisher>,
    /// Set by dispatch while shutting down; such items are answered with an
    /// error instead of being executed
    pub shutdown: bool,
}

impl CommandInvocation {
    pub fn new(
        topic: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        catalog: Arc<BundleCatalog>,
        engines: Arc<dyn EngineResolver>,
        publisher: Arc<dyn MessagePublisher>,
    ) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            catalog,
            engines,
            publisher,
            shutdown: false,
        }
    }

    pub fn with_shutdown(mut self, shutdown: bool) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Topic and payload must both be present for the item to be processed
    pub fn has_context(&self) -> bool {
        !self.topic.trim().is_empty() && !self.payload.is_empty()
    }
}

impl fmt::Debug for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandInvocation")
            .field("topic", &self.topic)
            .field("payload_bytes", &self.payload.len())
            .field("catalog_bundles", &self.catalog.count())
            .field("shutdown", &self.shutdown)
            .finish()
    }
}

/// Item carried by the work queue
#[derive(Debug, Clone)]
pub enum WorkItem {
    Invocation(CommandInvocation),
    /// Anything dispatch could not turn into an invocation
    Unrecognized { description: String },
}

impl From<CommandInvocation> for WorkItem {
    fn from(invocation: CommandInvocation) -> Self {
        WorkItem::Invocation(invocation)
    }
}
