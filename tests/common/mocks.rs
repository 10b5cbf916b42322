use async_trait::async_trait;
use command_relay::bundle::{Bundle, BundleCatalog};
use command_relay::execution::{
    CommandInvocation, Engine, EngineError, EngineRegistry, ExecutionEnvironment,
    ExecutionOutcome, QueueError, WorkItem, WorkQueue,
};
use command_relay::messaging::{ExecutionRequest, ExecutionResponse, MessagePublisher};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_ENGINE: &str = "scripted";

/// Publisher that records every message instead of sending it
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
}

impl RecordingPublisher {
    pub fn count(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn responses(&self) -> Vec<(String, ExecutionResponse)> {
        self.messages
            .lock()
            .iter()
            .map(|(topic, payload)| {
                let response: ExecutionResponse =
                    serde_json::from_slice(payload).expect("published payload is a response");
                (topic.clone(), response)
            })
            .collect()
    }
}

#[async_trait]
impl MessagePublisher for RecordingPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) {
        self.messages.lock().push((topic.to_string(), payload));
    }
}

/// Environment that returns a canned outcome, optionally after a delay
pub struct StaticEnvironment {
    outcome: ExecutionOutcome,
    delay: Option<Duration>,
    executions: Arc<AtomicUsize>,
}

#[async_trait]
impl ExecutionEnvironment for StaticEnvironment {
    async fn execute(&self, _request: &ExecutionRequest) -> ExecutionOutcome {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

/// Engine with scripted behavior that counts acquire/release calls
pub struct ScriptedEngine {
    outcome: ExecutionOutcome,
    environment_error: Option<String>,
    delay: Option<Duration>,
    pub acquired: AtomicUsize,
    pub released: AtomicUsize,
    pub executions: Arc<AtomicUsize>,
    /// `(pipeline_id, bundle key)` for every acquisition
    pub acquisitions: Mutex<Vec<(String, String)>>,
}

impl ScriptedEngine {
    pub fn succeeding(output: &str) -> Self {
        Self::with_outcome(ExecutionOutcome::success(output.as_bytes().to_vec()))
    }

    pub fn with_outcome(outcome: ExecutionOutcome) -> Self {
        Self {
            outcome,
            environment_error: None,
            delay: None,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
            executions: Arc::new(AtomicUsize::new(0)),
            acquisitions: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_environment(message: &str) -> Self {
        let mut engine = Self::succeeding("");
        engine.environment_error = Some(message.to_string());
        engine
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn acquired_bundles(&self) -> Vec<String> {
        self.acquisitions
            .lock()
            .iter()
            .map(|(_, bundle)| bundle.clone())
            .collect()
    }
}

#[async_trait]
impl Engine for ScriptedEngine {
    fn name(&self) -> &str {
        TEST_ENGINE
    }

    async fn new_environment(
        &self,
        pipeline_id: &str,
        bundle: &Arc<Bundle>,
    ) -> Result<Arc<dyn ExecutionEnvironment>, EngineError> {
        if let Some(message) = &self.environment_error {
            return Err(EngineError::environment_unavailable(bundle.key(), message));
        }

        self.acquired.fetch_add(1, Ordering::SeqCst);
        self.acquisitions
            .lock()
            .push((pipeline_id.to_string(), bundle.key()));

        Ok(Arc::new(StaticEnvironment {
            outcome: self.outcome.clone(),
            delay: self.delay,
            executions: Arc::clone(&self.executions),
        }))
    }

    fn release_environment(
        &self,
        _pipeline_id: &str,
        _bundle: &Arc<Bundle>,
        _environment: Arc<dyn ExecutionEnvironment>,
    ) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Shared collaborators for building invocations
pub struct Fixture {
    pub catalog: Arc<BundleCatalog>,
    pub engines: Arc<EngineRegistry>,
    pub engine: Arc<ScriptedEngine>,
    pub publisher: Arc<RecordingPublisher>,
}

impl Fixture {
    pub fn new(engine: ScriptedEngine) -> Self {
        let engine = Arc::new(engine);
        let engines = Arc::new(EngineRegistry::new());
        engines.register(engine.clone());

        Self {
            catalog: Arc::new(BundleCatalog::new()),
            engines,
            engine,
            publisher: Arc::new(RecordingPublisher::default()),
        }
    }

    pub fn with_bundles(self, bundles: &[(&str, &str)]) -> Self {
        for (name, version) in bundles {
            self.catalog
                .add(Bundle::new(*name, version, TEST_ENGINE).expect("valid test version"));
        }
        self
    }

    pub fn invocation(&self, payload: &Value) -> CommandInvocation {
        self.raw_invocation(serde_json::to_vec(payload).expect("json payload"))
    }

    pub fn raw_invocation(&self, payload: Vec<u8>) -> CommandInvocation {
        CommandInvocation::new(
            "relay.commands",
            payload,
            self.catalog.clone(),
            self.engines.clone(),
            self.publisher.clone(),
        )
    }
}

/// One scripted dequeue result
pub enum QueueStep {
    Item(WorkItem),
    Fail { error: QueueError, stopped: bool },
}

/// Queue that replays a fixed script, then reports `Closed`
#[derive(Default)]
pub struct ScriptedQueue {
    steps: Mutex<VecDeque<QueueStep>>,
    stopped: AtomicBool,
    pub dequeues: AtomicUsize,
}

impl ScriptedQueue {
    pub fn new(steps: Vec<QueueStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            ..Self::default()
        }
    }

    pub fn dequeues(&self) -> usize {
        self.dequeues.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkQueue for ScriptedQueue {
    async fn dequeue(&self) -> Result<WorkItem, QueueError> {
        self.dequeues.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().pop_front();
        match step {
            Some(QueueStep::Item(item)) => {
                self.stopped.store(false, Ordering::SeqCst);
                Ok(item)
            }
            Some(QueueStep::Fail { error, stopped }) => {
                self.stopped.store(stopped, Ordering::SeqCst);
                Err(error)
            }
            None => {
                self.stopped.store(false, Ordering::SeqCst);
                Err(QueueError::Closed)
            }
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
