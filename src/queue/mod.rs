//! Message queues
//!
//! Queues move notification data between threads without holding any
//! registry lock. A producer pushes a [`Message`] while the consumer, usually
//! a periodic timer, pops until the queue is empty.
//!
//! ```text
//!   notifier ──push_message()──►  ┌──────────────────────┐
//!   notifier ──push_message()──►  │ Mutex<VecDeque<Msg>> │ ──pop_message()──► timer tick
//!                                 └──────────────────────┘
//! ```

pub mod fifo;
pub mod message;

pub use fifo::MessageQueue;
pub use message::{Message, MessageStorage, Payload, ReleaseFn};

/// Error type for queue operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// Message had no payload
    EmptyPayload,
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::EmptyPayload => write!(f, "Message payload is empty"),
        }
    }
}

impl std::error::Error for QueueError {}
