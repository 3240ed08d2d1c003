//! Reasoning-text store.
//!
//! Completed reasoning summaries are persisted here, keyed by their
//! call-correlation id, so a later turn can re-attach them to the matching
//! assistant tool call. The store is injected per fetch; nothing in the wire
//! layer shares one across requests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// Store for completed reasoning text, keyed by call-correlation id.
pub trait ReasoningStore: Send + Sync {
    /// Persist the reasoning text for a correlation id.
    fn put(&self, key: &str, text: String);

    /// Look up the reasoning text for a correlation id.
    fn get(&self, key: &str) -> Option<String>;

    /// Remove and return the reasoning text for a correlation id.
    fn take(&self, key: &str) -> Option<String>;
}

/// In-memory reasoning store.
#[derive(Debug, Default)]
pub struct InMemoryReasoningStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryReasoningStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind an `Arc`, ready to inject.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl ReasoningStore for InMemoryReasoningStore {
    fn put(&self, key: &str, text: String) {
        self.entries.write().insert(key.to_string(), text);
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn take(&self, key: &str) -> Option<String> {
        self.entries.write().remove(key)
    }
}
