use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use protocol::Frame;

/// Most frames a session may have waiting for the game thread.
pub const MAXIMUM_QUEUED_MESSAGES: usize = 50;

/// Frames received by a connection and not yet handled by the game thread.
#[derive(Debug, Clone)]
pub struct Inbox {
    queue: Arc<Mutex<VecDeque<Frame>>>,
    capacity: usize,
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Queues a frame. Returns false, dropping the frame, when the inbox is full.
    pub fn push(&self, frame: Frame) -> bool {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(frame);
        true
    }

    pub fn drain(&self) -> Vec<Frame> {
        self.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Frame>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new(MAXIMUM_QUEUED_MESSAGES)
    }
}
