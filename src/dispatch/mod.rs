//! Command dispatcher
//!
//! Routes incoming commands to the appropriate handler.
//! This module provides loose coupling between the server and command implementations,
//! and is the single place where successful writes are handed to the AOF.

use crate::aof::{self, AofConfig, AofError, AofWriter};
use crate::commands::{wrong_arity, CommandContext, CommandRegistry};
use crate::protocol::RespValue;
use crate::store::MemoryStore;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Command dispatcher
///
/// Receives RESP commands, validates them, and routes to appropriate handlers
pub struct Dispatcher {
    /// Command registry
    registry: CommandRegistry,

    /// Command execution context
    context: CommandContext,

    /// Where committed writes are logged, if persistence is on
    aof: Option<Arc<AofWriter>>,

    /// Held from a write's commit until its append
    write_order: Mutex<()>,
}

impl Dispatcher {
    /// Create a new dispatcher over an empty store, without persistence
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    /// Create a dispatcher over an existing store, without persistence
    pub fn with_store(store: Arc<MemoryStore>) -> Self {
        Dispatcher {
            registry: CommandRegistry::new(),
            context: CommandContext::with_store(store),
            aof: None,
            write_order: Mutex::new(()),
        }
    }

    /// Log successful writes through `writer`
    pub fn with_aof_writer(mut self, writer: Arc<AofWriter>) -> Self {
        self.aof = Some(writer);
        self
    }

    /// Create a dispatcher with AOF support
    ///
    /// Replays the existing log into a fresh store, then opens it for
    /// appending. Any replay failure is returned and nothing is served.
    pub fn with_aof(config: &AofConfig) -> Result<Self, AofError> {
        if !config.enabled {
            info!("AOF disabled, starting with an empty store");
            return Ok(Self::new());
        }

        info!("Loading AOF from {:?}", config.path);
        let (store, stats) = aof::replay(&config.path, config.load_truncated)?;

        let writer = AofWriter::new(&config.path, config.sync_policy)?;
        if stats.truncated {
            writer.truncate(stats.bytes as u64)?;
            warn!("Cut AOF {:?} back to {} bytes", config.path, stats.bytes);
        }
        info!(
            "AOF writer initialized at {:?} (appendfsync {})",
            config.path, config.sync_policy
        );

        Ok(Self::with_store(store).with_aof_writer(Arc::new(writer)))
    }

    /// Execute a command frame without logging it
    ///
    /// Takes a RESP value (expected to be an array of bulk strings), extracts
    /// the command name and arguments, then routes to the appropriate handler.
    /// Every failure comes back as an error reply.
    pub fn execute(&self, frame: &RespValue) -> RespValue {
        let (name, args) = match split_command(frame) {
            Some(parts) => parts,
            None => {
                return RespValue::error(
                    "ERR",
                    "Protocol error: expected array of bulk strings",
                );
            }
        };

        let cmd_name = String::from_utf8_lossy(&name);
        debug!("Dispatching command: {} ({} args)", cmd_name, args.len());

        // Look up the command
        let command = match self.registry.get(&cmd_name) {
            Some(cmd) => cmd,
            None => {
                warn!("Unknown command: {}", cmd_name);
                return unknown_command(&cmd_name, &args);
            }
        };

        // Validate argument count
        if args.len() < command.min_args()
            || command.max_args().is_some_and(|max| args.len() > max)
        {
            return wrong_arity(command.name());
        }

        command.execute(&self.context, &args)
    }

    /// Execute a command frame and log it if it changed the store
    ///
    /// The original frame is appended after the store commit and before the
    /// reply is returned. Error replies are never logged. An `Err` means the
    /// write is applied in memory but could not be made durable.
    ///
    /// Writes are serialized from commit to append, so the log holds them in
    /// the order they were applied. Reads never wait on this.
    pub fn dispatch(&self, frame: &RespValue) -> Result<RespValue, AofError> {
        let writer = match &self.aof {
            Some(writer) if self.is_write(frame) => writer,
            _ => return Ok(self.execute(frame)),
        };

        let _order = self.write_order.lock();
        let reply = self.execute(frame);
        if !reply.is_error() {
            writer.append(frame)?;
        }

        Ok(reply)
    }

    /// Shared store behind this dispatcher
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.context.store
    }

    /// AOF writer, when persistence is on
    pub fn aof_writer(&self) -> Option<&Arc<AofWriter>> {
        self.aof.as_ref()
    }

    fn is_write(&self, frame: &RespValue) -> bool {
        frame
            .as_array()
            .and_then(|items| items.first())
            .and_then(RespValue::as_bulk_string)
            .and_then(|name| self.registry.get(&String::from_utf8_lossy(name)))
            .is_some_and(|cmd| cmd.is_write())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Split a non-empty array of bulk strings into name and arguments
fn split_command(frame: &RespValue) -> Option<(Bytes, Vec<Bytes>)> {
    let mut tokens = frame
        .as_array()?
        .iter()
        .map(|item| item.as_bulk_string().cloned())
        .collect::<Option<Vec<Bytes>>>()?;

    if tokens.is_empty() {
        return None;
    }

    let name = tokens.remove(0);
    Some((name, tokens))
}

/// `ERR unknown command '<name>', with args beginning with: '<a>' ...`
fn unknown_command(name: &str, args: &[Bytes]) -> RespValue {
    let mut message = format!("unknown command '{}', with args beginning with: ", name);
    for arg in args {
        message.push_str(&format!("'{}' ", String::from_utf8_lossy(arg)));
    }
    RespValue::error("ERR", message)
}
