//! Worker Pool Management
//!
//! Spawns a fixed number of [`ExecutionWorker`] loops on the tokio runtime.
//! Workers share the queue and nothing else; a worker that hits a fatal
//! dequeue error ends on its own without affecting the rest of the pool.

use super::queue::WorkQueue;
use super::worker::{ExecutionWorker, WorkerExit};
use crate::config::{RelayConfig, WorkerConfig};
use crate::error::{RelayError, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

/// Pool of execution workers
///
/// # Examples
///
/// ```rust
/// use command_relay::config::WorkerConfig;
/// use command_relay::execution::{MemoryWorkQueue, WorkerPool};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() {
///     let queue = Arc::new(MemoryWorkQueue::new());
///     let pool = WorkerPool::spawn(4, WorkerConfig::default(), queue.clone());
///     assert_eq!(pool.len(), 4);
///
///     queue.close();
///     let exits = pool.join().await.unwrap();
///     assert_eq!(exits.len(), 4);
/// }
/// ```
pub struct WorkerPool {
    workers: Vec<(Uuid, JoinHandle<WorkerExit>)>,
}

impl WorkerPool {
    /// Start `size` workers (at least one) consuming from `queue`
    pub fn spawn(size: usize, config: WorkerConfig, queue: Arc<dyn WorkQueue>) -> Self {
        let size = size.max(1);
        let workers = (0..size)
            .map(|_| {
                let worker = ExecutionWorker::new(Arc::clone(&queue), config);
                let id = worker.id();
                (id, tokio::spawn(worker.run()))
            })
            .collect();

        info!(
            pool_size = size,
            dequeue_backoff_ms = config.dequeue_backoff.as_millis() as u64,
            "Execution worker pool started"
        );

        Self { workers }
    }

    /// Start the pool described by a loaded configuration
    pub fn from_config(config: &RelayConfig, queue: Arc<dyn WorkQueue>) -> Self {
        Self::spawn(config.worker.pool_size, config.worker_config(), queue)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn worker_ids(&self) -> Vec<Uuid> {
        self.workers.iter().map(|(id, _)| *id).collect()
    }

    /// Number of workers whose loop has ended
    pub fn finished_count(&self) -> usize {
        self.workers
            .iter()
            .filter(|(_, handle)| handle.is_finished())
            .count()
    }

    /// Wait for every worker to exit
    pub async fn join(self) -> Result<Vec<WorkerExit>> {
        let (ids, handles): (Vec<Uuid>, Vec<_>) = self.workers.into_iter().unzip();
        let results = join_all(handles).await;

        ids.into_iter()
            .zip(results)
            .map(|(id, result)| result.map_err(|e| RelayError::from_join_error(id, e)))
            .collect()
    }

    /// Abort every worker without waiting for in-flight commands
    pub fn abort(&self) {
        for (_, handle) in &self.workers {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{MemoryWorkQueue, QueueError};
    use std::time::Duration;

    #[tokio::test]
    async fn test_pool_exits_when_queue_closes() {
        let queue = Arc::new(MemoryWorkQueue::new());
        let pool = WorkerPool::spawn(3, WorkerConfig::default(), queue.clone());
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.worker_ids().len(), 3);

        queue.close();
        let exits = tokio::time::timeout(Duration::from_secs(2), pool.join())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(exits.len(), 3);
        assert!(exits.iter().all(|exit| exit.error == QueueError::Closed));
    }

    #[tokio::test]
    async fn test_zero_size_still_spawns_one_worker() {
        let queue = Arc::new(MemoryWorkQueue::new());
        let pool = WorkerPool::spawn(0, WorkerConfig::default(), queue.clone());
        assert_eq!(pool.len(), 1);
        queue.close();
        pool.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_from_config_uses_pool_size() {
        let mut config = RelayConfig::default();
        config.worker.pool_size = 2;

        let queue = Arc::new(MemoryWorkQueue::new());
        let pool = WorkerPool::from_config(&config, queue.clone());
        assert_eq!(pool.len(), 2);

        let ids = pool.worker_ids();
        pool.abort();
        let err = pool.join().await.unwrap_err();
        assert!(matches!(err, RelayError::WorkerCancelled { .. }));
        assert!(ids.contains(&err.worker_id()));
    }
}
