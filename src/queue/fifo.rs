//! Thread-safe FIFO of messages

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::message::{Message, Payload};
use super::QueueError;

/// FIFO message queue
///
/// Shared between producers and a consumer through `Arc<MessageQueue<T>>`.
/// Dropping the last reference releases every message still queued.
///
/// Methods taking `&self` lock the queue. The `*_exclusive` variants take
/// `&mut self` and skip locking entirely; they are the unsynchronized mode
/// for a queue that has a single owner.
pub struct MessageQueue<T> {
    messages: Mutex<VecDeque<Message<T>>>,
    pushed: AtomicU64,
    popped: AtomicU64,
}

impl<T: Payload> MessageQueue<T> {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(VecDeque::new()),
            pushed: AtomicU64::new(0),
            popped: AtomicU64::new(0),
        }
    }

    /// Append a message at the tail
    pub fn push_message(&self, msg: Message<T>) -> Result<(), QueueError> {
        if msg.is_empty_payload() {
            return Err(QueueError::EmptyPayload);
        }

        self.messages.lock().push_back(msg);
        self.pushed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Detach the message at the head
    pub fn pop_message(&self) -> Option<Message<T>> {
        let msg = self.messages.lock().pop_front();
        if msg.is_some() {
            self.popped.fetch_add(1, Ordering::Relaxed);
        }
        msg
    }

    /// Append without locking
    pub fn push_exclusive(&mut self, msg: Message<T>) -> Result<(), QueueError> {
        if msg.is_empty_payload() {
            return Err(QueueError::EmptyPayload);
        }

        self.messages.get_mut().push_back(msg);
        *self.pushed.get_mut() += 1;
        Ok(())
    }

    /// Pop without locking
    pub fn pop_exclusive(&mut self) -> Option<Message<T>> {
        let msg = self.messages.get_mut().pop_front();
        if msg.is_some() {
            *self.popped.get_mut() += 1;
        }
        msg
    }
}

impl<T> MessageQueue<T> {
    /// Point-in-time emptiness check
    ///
    /// Not linearizable with concurrent pushes. To consume everything that is
    /// queued, loop on `pop_message` until it returns `None`.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Number of queued messages (snapshot)
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Pop every queued message at once
    pub fn drain(&self) -> Vec<Message<T>> {
        let drained: Vec<_> = self.messages.lock().drain(..).collect();
        self.popped
            .fetch_add(drained.len() as u64, Ordering::Relaxed);
        drained
    }

    /// Release every queued message, leaving the queue usable
    ///
    /// Returns the number of messages released.
    pub fn clear(&self) -> usize {
        // release callbacks run after the lock is dropped
        let released = std::mem::take(&mut *self.messages.lock());
        released.len()
    }

    /// Total messages pushed over the queue lifetime
    pub fn pushed_count(&self) -> u64 {
        self.pushed.load(Ordering::Relaxed)
    }

    /// Total messages popped over the queue lifetime
    pub fn popped_count(&self) -> u64 {
        self.popped.load(Ordering::Relaxed)
    }
}

impl<T: Payload> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for MessageQueue<T> {
    fn drop(&mut self) {
        let remaining = self.messages.get_mut().len();
        if remaining > 0 {
            tracing::trace!(remaining = remaining, "Releasing queued messages");
        }
    }
}

impl<T> std::fmt::Debug for MessageQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageQueue")
            .field("len", &self.len())
            .field("pushed", &self.pushed_count())
            .field("popped", &self.popped_count())
            .finish()
    }
}
