//! Command execution module
//!
//! Provides a unified interface for all commands through the Command trait.
//! Each command family is implemented in a separate file for high cohesion.

mod context;
mod registry;

// Command implementations
mod connection;
mod string;
mod key;
mod counter;
mod list;

pub use context::CommandContext;
pub use registry::CommandRegistry;

use crate::protocol::RespValue;
use bytes::Bytes;

/// Command execution trait
///
/// All commands implement this trait with a single execute method.
/// This provides loose coupling between command implementations and the dispatcher.
pub trait Command: Send + Sync {
    /// Execute the command with the given context and arguments
    ///
    /// Arguments:
    /// - ctx: the command context (contains the store)
    /// - args: command arguments (excluding the command name itself),
    ///   already checked against `min_args`/`max_args`
    ///
    /// Returns:
    /// - RespValue representing the response to send to the client
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue;

    /// Get the command name (for lookup, arity errors and logging)
    fn name(&self) -> &'static str;

    /// Get the minimum number of arguments required
    fn min_args(&self) -> usize {
        0
    }

    /// Get the maximum number of arguments (None = unlimited)
    fn max_args(&self) -> Option<usize> {
        None
    }

    /// Whether a successful execution changes the store and must be logged
    fn is_write(&self) -> bool {
        false
    }
}

/// `ERR wrong number of arguments for '<cmd>' command`
pub(crate) fn wrong_arity(command: &str) -> RespValue {
    RespValue::error(
        "ERR",
        format!(
            "wrong number of arguments for '{}' command",
            command.to_lowercase()
        ),
    )
}

/// `WRONGTYPE Operation against a key holding the wrong kind of value`
pub(crate) fn wrong_type() -> RespValue {
    RespValue::error(
        "WRONGTYPE",
        "Operation against a key holding the wrong kind of value",
    )
}

/// `ERR value is not an integer or out of range`
pub(crate) fn not_integer() -> RespValue {
    RespValue::error("ERR", "value is not an integer or out of range")
}

/// Helper function to parse an integer argument
pub(crate) fn parse_integer(arg: &Bytes) -> Result<i64, RespValue> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(not_integer)
}

/// Build an argument list from string literals
#[cfg(test)]
pub(crate) fn args(tokens: &[&str]) -> Vec<Bytes> {
    tokens.iter().map(|t| Bytes::copy_from_slice(t.as_bytes())).collect()
}
