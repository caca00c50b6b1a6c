//! FerrumKV - A lightweight in-memory key-value store speaking RESP
//!
//! FerrumKV is designed with strong cohesion and loose coupling principles:
//! - Each module has a single, well-defined responsibility
//! - Modules communicate through clear, minimal interfaces
//! - No circular dependencies between modules
//!
//! Data flows `server` -> `protocol` -> `dispatch` -> `commands` -> `store`,
//! with `dispatch` handing committed writes to `aof`.

pub mod protocol;
pub mod store;
pub mod commands;
pub mod dispatch;
pub mod server;
pub mod aof;
pub mod config;

/// Re-export commonly used types
pub use store::{MemoryStore, Entry, Value};
pub use protocol::{RespValue, RespError};
pub use commands::{Command, CommandContext};
pub use dispatch::Dispatcher;
pub use config::Config;
