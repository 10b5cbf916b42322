//! # Work Queue
//!
//! The seam between the dispatch layer and the execution workers, plus an
//! in-memory multi-consumer implementation.
//!
//! A stopped queue is paused, not dead: pending items stay queued and
//! workers back off until [`MemoryWorkQueue::start`] resumes delivery. A
//! closed queue is terminal: items already queued are still handed out,
//! then every dequeue fails with [`QueueError::Closed`].

use super::invocation::WorkItem;
use crate::config::QueueSettings;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Work queue is stopped")]
    Stopped,

    #[error("Work queue is closed")]
    Closed,

    #[error("Work queue at capacity: {capacity} items")]
    Full { capacity: usize },

    #[error("Work queue backend error: {message}")]
    Backend { message: String },
}

impl QueueError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Blocking, stoppable FIFO of work items
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Wait for the next item
    async fn dequeue(&self) -> Result<WorkItem, QueueError>;

    /// True while the queue is stopped or draining; dequeue errors in this
    /// state are not fatal
    fn is_stopped(&self) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryWorkQueue {
    items: Mutex<VecDeque<WorkItem>>,
    capacity: Option<usize>,
    stopped: AtomicBool,
    closed: AtomicBool,
    notify: Notify,
}

impl MemoryWorkQueue {
    /// Unbounded queue
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn from_config(settings: &QueueSettings) -> Self {
        Self {
            capacity: settings.capacity,
            ..Self::default()
        }
    }

    pub fn enqueue(&self, item: WorkItem) -> Result<(), QueueError> {
        {
            let mut items = self.items.lock();
            // Checked under the lock so close() cannot slip in before the push
            if self.closed.load(Ordering::Acquire) {
                return Err(QueueError::Closed);
            }
            if let Some(capacity) = self.capacity {
                if items.len() >= capacity {
                    return Err(QueueError::Full { capacity });
                }
            }
            items.push_back(item);
        }

        self.notify.notify_one();
        Ok(())
    }

    /// Pause delivery; pending items are kept
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_waiters();
        debug!(pending = self.len(), "Work queue stopped");
    }

    /// Resume delivery after [`stop`](Self::stop)
    pub fn start(&self) {
        self.stopped.store(false, Ordering::Release);
        self.notify.notify_waiters();
        debug!(pending = self.len(), "Work queue started");
    }

    /// Permanently close the queue; dequeues fail once it is drained
    pub fn close(&self) {
        {
            let _items = self.items.lock();
            self.closed.store(true, Ordering::Release);
        }
        self.notify.notify_waiters();
        debug!(pending = self.len(), "Work queue closed");
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn try_dequeue(&self) -> Option<Result<WorkItem, QueueError>> {
        let closed = self.closed.load(Ordering::Acquire);
        if !closed && self.stopped.load(Ordering::Acquire) {
            return Some(Err(QueueError::Stopped));
        }

        let mut items = self.items.lock();
        match items.pop_front() {
            Some(item) => {
                if !items.is_empty() {
                    // Hand the wakeup on so a second waiter sees the remaining items
                    self.notify.notify_one();
                }
                Some(Ok(item))
            }
            None if closed => Some(Err(QueueError::Closed)),
            None => None,
        }
    }
}

#[async_trait]
impl WorkQueue for MemoryWorkQueue {
    async fn dequeue(&self) -> Result<WorkItem, QueueError> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking state so a concurrent enqueue or
            // stop cannot slip between the check and the wait
            notified.as_mut().enable();

            if let Some(result) = self.try_dequeue() {
                return result;
            }

            notified.await;
        }
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }
}
