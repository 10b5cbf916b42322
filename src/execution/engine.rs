//! # Runtime Engines
//!
//! Traits for the pluggable runtimes that execute bundle commands, the
//! [`EngineRegistry`] resolver, and [`EnvironmentLease`], which ties an
//! acquired execution environment to its release.

use crate::bundle::Bundle;
use crate::messaging::ExecutionRequest;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("No engine registered for '{engine}'")]
    NoEngine { engine: String },

    #[error("Failed to create execution environment for {bundle}: {message}")]
    EnvironmentUnavailable { bundle: String, message: String },

    #[error("{message}")]
    Execution { message: String },

    #[error("Engine error: {message}")]
    Other { message: String },
}

impl EngineError {
    pub fn no_engine(engine: impl Into<String>) -> Self {
        Self::NoEngine {
            engine: engine.into(),
        }
    }

    pub fn environment_unavailable(bundle: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvironmentUnavailable {
            bundle: bundle.into(),
            message: message.into(),
        }
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Raw results of one command run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Structured command output
    pub output: Vec<u8>,
    /// Diagnostic stream, separate from output
    pub errors: Vec<u8>,
    /// Set when the command itself failed
    pub error: Option<EngineError>,
}

impl ExecutionOutcome {
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn failure(error: EngineError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn with_errors(mut self, errors: impl Into<Vec<u8>>) -> Self {
        self.errors = errors.into();
        self
    }
}

/// Per-(pipeline, bundle) execution context
#[async_trait]
pub trait ExecutionEnvironment: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> ExecutionOutcome;
}

/// A runtime capable of executing commands for a kind of bundle.
///
/// Engines may pool environments per key; concurrent invocations sharing a
/// key are the engine's to serialize.
#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    async fn new_environment(
        &self,
        pipeline_id: &str,
        bundle: &Arc<Bundle>,
    ) -> Result<Arc<dyn ExecutionEnvironment>, EngineError>;

    fn release_environment(
        &self,
        pipeline_id: &str,
        bundle: &Arc<Bundle>,
        environment: Arc<dyn ExecutionEnvironment>,
    );
}

/// Picks the engine for a bundle
pub trait EngineResolver: Send + Sync {
    fn engine_for_bundle(&self, bundle: &Bundle) -> Result<Arc<dyn Engine>, EngineError>;
}

/// Resolver keyed by the engine name a bundle declares
#[derive(Default)]
pub struct EngineRegistry {
    engines: DashMap<String, Arc<dyn Engine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an engine under its own name, replacing any previous one
    pub fn register(&self, engine: Arc<dyn Engine>) {
        let name = engine.name().to_string();
        if self.engines.insert(name.clone(), engine).is_some() {
            warn!(engine = %name, "Engine already registered, replacing");
        } else {
            info!(engine = %name, "Engine registered");
        }
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    pub fn engine_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.engine_names())
            .finish()
    }
}

impl EngineResolver for EngineRegistry {
    fn engine_for_bundle(&self, bundle: &Bundle) -> Result<Arc<dyn Engine>, EngineError> {
        self.engines
            .get(&bundle.engine)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::no_engine(&bundle.engine))
    }
}

/// An acquired environment, released back to its engine on drop
pub struct EnvironmentLease {
    engine: Arc<dyn Engine>,
    pipeline_id: String,
    bundle: Arc<Bundle>,
    environment: Arc<dyn ExecutionEnvironment>,
}

impl EnvironmentLease {
    pub async fn acquire(
        engine: Arc<dyn Engine>,
        pipeline_id: &str,
        bundle: Arc<Bundle>,
    ) -> Result<Self, EngineError> {
        let environment = engine.new_environment(pipeline_id, &bundle).await?;
        debug!(
            engine = %engine.name(),
            pipeline_id = %pipeline_id,
            bundle = %bundle.key(),
            "Execution environment acquired"
        );
        Ok(Self {
            engine,
            pipeline_id: pipeline_id.to_string(),
            bundle,
            environment,
        })
    }

    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        self.environment.execute(request).await
    }
}

impl Drop for EnvironmentLease {
    fn drop(&mut self) {
        self.engine.release_environment(
            &self.pipeline_id,
            &self.bundle,
            Arc::clone(&self.environment),
        );
        debug!(
            engine = %self.engine.name(),
            pipeline_id = %self.pipeline_id,
            bundle = %self.bundle.key(),
            "Execution environment released"
        );
    }
}
