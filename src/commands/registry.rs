//! Command registry
//!
//! Centralized registry for all available commands.
//! This allows loose coupling between command implementations and the dispatcher.

use super::{Command, connection, string, key, counter, list};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of all available commands
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a new command registry and register all commands
    pub fn new() -> Self {
        let mut registry = CommandRegistry {
            commands: HashMap::new(),
        };

        // Register connection commands
        registry.register(Arc::new(connection::PingCommand));
        registry.register(Arc::new(connection::EchoCommand));

        // Register string commands
        registry.register(Arc::new(string::SetCommand));
        registry.register(Arc::new(string::GetCommand));

        // Register key commands
        registry.register(Arc::new(key::DelCommand));
        registry.register(Arc::new(key::ExistsCommand));

        // Register counter commands
        registry.register(Arc::new(counter::IncrCommand));
        registry.register(Arc::new(counter::DecrCommand));

        // Register list commands
        registry.register(Arc::new(list::LPushCommand));
        registry.register(Arc::new(list::RPushCommand));
        registry.register(Arc::new(list::LRangeCommand));

        registry
    }

    /// Register a command
    fn register(&mut self, command: Arc<dyn Command>) {
        let name = command.name().to_uppercase();
        self.commands.insert(name, command);
    }

    /// Get a command by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands.get(&name.to_uppercase()).cloned()
    }

    /// Check if a command exists
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_uppercase())
    }

    /// Get all command names
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
