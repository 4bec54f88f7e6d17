//! Queued message types
//!
//! A message either owns its payload outright or holds a payload whose
//! lifetime is managed elsewhere and must be handed back through a release
//! callback when the message is freed.

use bytes::Bytes;

/// Callback that takes back an externally owned payload
pub type ReleaseFn<T> = Box<dyn FnOnce(T) + Send>;

/// Payloads that can travel through a [`MessageQueue`](super::MessageQueue)
pub trait Payload: Send + 'static {
    /// Whether the payload carries no data and should be rejected on push
    fn is_empty_payload(&self) -> bool {
        false
    }
}

impl Payload for Bytes {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl Payload for Vec<u8> {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl Payload for String {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

/// How the payload of a message is held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStorage {
    /// Payload was moved into the message and is dropped with it
    Inline,
    /// Payload belongs to someone else and is returned via a release callback
    External,
}

enum Storage<T> {
    Inline(T),
    External(T, Option<ReleaseFn<T>>),
}

/// A single queued message
pub struct Message<T> {
    storage: Option<Storage<T>>,
}

impl<T> Message<T> {
    /// Create a message that owns its payload
    pub fn new(data: T) -> Self {
        Self {
            storage: Some(Storage::Inline(data)),
        }
    }

    /// Create a message holding an externally owned payload
    ///
    /// `release` runs exactly once, when the message is dropped (popped and
    /// freed, or discarded by queue destruction).
    pub fn with_release<F>(data: T, release: F) -> Self
    where
        F: FnOnce(T) + Send + 'static,
    {
        Self {
            storage: Some(Storage::External(data, Some(Box::new(release)))),
        }
    }

    /// Create a message holding an externally owned payload with no release
    /// callback; the owner manages the payload lifetime itself.
    pub fn borrowed(data: T) -> Self {
        Self {
            storage: Some(Storage::External(data, None)),
        }
    }

    /// Storage style of this message
    pub fn storage(&self) -> MessageStorage {
        match self.storage {
            Some(Storage::External(..)) => MessageStorage::External,
            _ => MessageStorage::Inline,
        }
    }

    /// Access the payload
    pub fn data(&self) -> &T {
        match self.storage.as_ref() {
            Some(Storage::Inline(data)) | Some(Storage::External(data, _)) => data,
            // storage is only taken in Drop
            None => unreachable!("message payload accessed after release"),
        }
    }
}

impl<T: Payload> Message<T> {
    pub(super) fn is_empty_payload(&self) -> bool {
        self.data().is_empty_payload()
    }
}

impl<T> Drop for Message<T> {
    fn drop(&mut self) {
        if let Some(Storage::External(data, Some(release))) = self.storage.take() {
            release(data);
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Message<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("storage", &self.storage())
            .field("data", self.data())
            .finish()
    }
}
