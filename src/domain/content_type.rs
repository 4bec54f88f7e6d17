//! Content type registry
//!
//! Notification bodies are opaque bytes. A registered content type tells a
//! consumer how to interpret a body and optionally runs a release hook when
//! a notification carrying it is freed.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;

/// Hook run when a notification body of this type is released
pub type ContentReleaseFn = Box<dyn Fn(&Bytes) + Send + Sync>;

/// A registered content type
pub struct ContentType {
    name: String,
    release: Option<ContentReleaseFn>,
}

impl ContentType {
    /// Content type name (e.g. `application/pidf+xml`)
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn release(&self, body: &Bytes) {
        if let Some(ref release) = self.release {
            release(body);
        }
    }
}

impl std::fmt::Debug for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentType")
            .field("name", &self.name)
            .field("has_release", &self.release.is_some())
            .finish()
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Per-domain set of content types, keyed case-insensitively by name
#[derive(Debug, Default)]
pub struct ContentTypeRegistry {
    types: RwLock<Vec<Arc<ContentType>>>,
}

impl ContentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a content type
    ///
    /// Registering a name twice returns the existing entry; its release hook
    /// is kept and the new one is discarded.
    pub fn register(&self, name: &str, release: Option<ContentReleaseFn>) -> Arc<ContentType> {
        let mut types = self.types.write();

        if let Some(existing) = types.iter().find(|t| t.name.eq_ignore_ascii_case(name)) {
            return Arc::clone(existing);
        }

        let content_type = Arc::new(ContentType {
            name: name.to_string(),
            release,
        });
        types.push(Arc::clone(&content_type));

        tracing::debug!(content_type = name, "Content type registered");
        content_type
    }

    /// Look up a content type by name
    pub fn find(&self, name: &str) -> Option<Arc<ContentType>> {
        self.types
            .read()
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.types.write().clear();
    }
}
