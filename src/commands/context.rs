//! Command execution context

use crate::store::MemoryStore;
use std::sync::Arc;

/// Context provided to commands during execution
///
/// This context gives commands access to the store and any other
/// resources they need. Keeps coupling loose by providing a clean interface.
#[derive(Clone)]
pub struct CommandContext {
    /// The shared memory store
    pub store: Arc<MemoryStore>,
}

impl CommandContext {
    /// Create a new command context with an empty store
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Create a context around an existing store
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        CommandContext { store }
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::new()
    }
}
