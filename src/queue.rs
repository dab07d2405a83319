// src/queue.rs

//! The operation queue between producers and the processing loop.
//!
//! Unbounded FIFO guarded by a mutex. Producers on any thread may `push`
//! while the loop thread `pull`s; neither side ever waits on the other beyond
//! the lock itself. Nothing is reordered, deduplicated or dropped.

use crate::operation::Operation;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
pub struct OperationQueue {
    ops: Mutex<VecDeque<Box<dyn Operation>>>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `op` at the tail.
    pub fn push(&self, op: Box<dyn Operation>) {
        self.lock().push_back(op);
    }

    /// Removes and returns the head, or `None` when empty.
    pub fn pull(&self) -> Option<Box<dyn Operation>> {
        self.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drops every queued operation and returns how many there were.
    pub fn clear(&self) -> usize {
        let discarded = std::mem::take(&mut *self.lock());
        discarded.len()
    }

    // No operation code runs while the lock is held, so a poisoned queue
    // still holds a consistent VecDeque.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Box<dyn Operation>>> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("len", &self.len())
            .finish()
    }
}
