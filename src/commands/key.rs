//! Key commands (DEL, EXISTS)

use super::{Command, CommandContext};
use crate::protocol::RespValue;
use bytes::Bytes;

/// DEL command - Delete one or more keys
///
/// Syntax: DEL key [key ...]
pub struct DelCommand;

impl Command for DelCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        let deleted = args.iter().filter(|key| ctx.store.delete(key)).count();
        RespValue::integer(deleted as i64)
    }

    fn name(&self) -> &'static str {
        "DEL"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// EXISTS command - Count how many of the given keys exist
///
/// Syntax: EXISTS key [key ...]
///
/// A key named twice is counted twice.
pub struct ExistsCommand;

impl Command for ExistsCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        let existing = args.iter().filter(|key| ctx.store.contains(key)).count();
        RespValue::integer(existing as i64)
    }

    fn name(&self) -> &'static str {
        "EXISTS"
    }

    fn min_args(&self) -> usize {
        1
    }
}
