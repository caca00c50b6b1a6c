//! Counter commands (INCR, DECR)

use super::{Command, CommandContext, not_integer, wrong_type};
use crate::protocol::RespValue;
use crate::store::{Entry, Value};
use bytes::Bytes;

/// INCR command - Increment the integer value of a key by 1
///
/// Syntax: INCR key
pub struct IncrCommand;

impl Command for IncrCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        apply_delta(ctx, &args[0], 1)
    }

    fn name(&self) -> &'static str {
        "INCR"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// DECR command - Decrement the integer value of a key by 1
///
/// Syntax: DECR key
pub struct DecrCommand;

impl Command for DecrCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        apply_delta(ctx, &args[0], -1)
    }

    fn name(&self) -> &'static str {
        "DECR"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// Add `delta` to the counter at `key`, starting from 0 when absent.
/// The key keeps whatever expiry it already had.
fn apply_delta(ctx: &CommandContext, key: &Bytes, delta: i64) -> RespValue {
    ctx.store.update(key, |slot| {
        let entry = match slot {
            Some(entry) => entry,
            None => {
                *slot = Some(Entry::new(Value::integer(delta)));
                return RespValue::integer(delta);
            }
        };

        match &mut entry.value {
            Value::Integer(i) => match i.checked_add(delta) {
                Some(v) => {
                    *i = v;
                    RespValue::integer(v)
                }
                None => RespValue::error("ERR", "increment or decrement would overflow"),
            },
            Value::String(_) => not_integer(),
            Value::List(_) => wrong_type(),
        }
    })
}
