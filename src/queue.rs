use std::collections::VecDeque;

use crate::error::EnqueueError;
use crate::types::QueuedJob;

/// Ordered buffer of pending forward jobs for one tenant.
///
/// FIFO: insertion order is delivery-attempt order. The queue is owned
/// exclusively by its tenant and mutated only under the tenant's lock,
/// so it carries no synchronization of its own.
///
/// Capacity is enforced on enqueue; a full queue drops the newest job
/// and reports [`EnqueueError::QueueFull`] so the caller can count it
/// without ever blocking the inbound side.
#[derive(Debug)]
pub struct MessageQueue {
    jobs: VecDeque<QueuedJob>,
    capacity: usize,
}

impl MessageQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append a job. Never blocks.
    pub fn enqueue(&mut self, job: QueuedJob) -> Result<(), EnqueueError> {
        if self.jobs.len() >= self.capacity {
            return Err(EnqueueError::QueueFull);
        }
        self.jobs.push_back(job);
        Ok(())
    }

    /// Remove and return the front job, non-blocking.
    pub fn dequeue(&mut self) -> Option<QueuedJob> {
        self.jobs.pop_front()
    }

    /// Front job without removing it.
    pub fn peek_front(&self) -> Option<&QueuedJob> {
        self.jobs.front()
    }

    /// Drop the front job without delivering it. Used by skip.
    pub fn drop_front(&mut self) -> bool {
        self.jobs.pop_front().is_some()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Discard all pending jobs. Used on tenant stop.
    pub fn clear(&mut self) {
        self.jobs.clear();
    }
}
