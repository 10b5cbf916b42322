//! # Command Execution
//!
//! The queue-driven execution pipeline: typed work items, the work queue
//! seam, engine traits, response building, and the worker loop and pool.

pub mod engine;
pub mod invocation;
pub mod outcome;
pub mod queue;
pub mod worker;
pub mod worker_pool;

pub use engine::{
    Engine, EngineError, EngineRegistry, EngineResolver, EnvironmentLease, ExecutionEnvironment,
    ExecutionOutcome,
};
pub use invocation::{CommandInvocation, WorkItem};
pub use outcome::{build_response, InvocationOutcome};
pub use queue::{MemoryWorkQueue, QueueError, WorkQueue};
pub use worker::{execute_command, Disposition, DropReason, ExecutionWorker, WorkerExit};
pub use worker_pool::WorkerPool;
