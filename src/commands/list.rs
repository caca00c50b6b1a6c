//! List commands (LPUSH, RPUSH, LRANGE)

use super::{Command, CommandContext, parse_integer, wrong_type};
use crate::protocol::RespValue;
use crate::store::{Entry, Value};
use bytes::Bytes;
use std::collections::VecDeque;

/// LPUSH command - Prepend one or multiple values to a list
///
/// Syntax: LPUSH key value [value ...]
///
/// Values are pushed one at a time, so the last one ends up at the head.
pub struct LPushCommand;

impl Command for LPushCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        push(ctx, &args[0], &args[1..], VecDeque::push_front)
    }

    fn name(&self) -> &'static str {
        "LPUSH"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// RPUSH command - Append one or multiple values to a list
///
/// Syntax: RPUSH key value [value ...]
pub struct RPushCommand;

impl Command for RPushCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        push(ctx, &args[0], &args[1..], VecDeque::push_back)
    }

    fn name(&self) -> &'static str {
        "RPUSH"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// Push every value onto the list at `key`, creating it when absent
fn push(
    ctx: &CommandContext,
    key: &Bytes,
    values: &[Bytes],
    push_one: fn(&mut VecDeque<Bytes>, Bytes),
) -> RespValue {
    ctx.store.update(key, |slot| {
        let entry = slot.get_or_insert_with(|| Entry::new(Value::empty_list()));

        match entry.value.as_list_mut() {
            Some(list) => {
                for value in values {
                    push_one(list, value.clone());
                }
                RespValue::integer(list.len() as i64)
            }
            None => wrong_type(),
        }
    })
}

/// LRANGE command - Get a range of elements from a list
///
/// Syntax: LRANGE key start stop
///
/// Negative indices count from the tail; `stop` past the end is clamped.
pub struct LRangeCommand;

impl Command for LRangeCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        let start = match parse_integer(&args[1]) {
            Ok(i) => i,
            Err(reply) => return reply,
        };

        let stop = match parse_integer(&args[2]) {
            Ok(i) => i,
            Err(reply) => return reply,
        };

        ctx.store.read(&args[0], |entry| {
            let list = match entry.map(|e| &e.value) {
                Some(Value::List(list)) => list,
                Some(_) => return wrong_type(),
                // Key doesn't exist, return empty array
                None => return RespValue::array(vec![]),
            };

            let items = match index_range(list.len(), start, stop) {
                Some((from, to)) => list
                    .range(from..=to)
                    .cloned()
                    .map(RespValue::bulk_string)
                    .collect(),
                None => Vec::new(),
            };

            RespValue::array(items)
        })
    }

    fn name(&self) -> &'static str {
        "LRANGE"
    }

    fn min_args(&self) -> usize {
        3
    }

    fn max_args(&self) -> Option<usize> {
        Some(3)
    }
}

/// Resolve `start`/`stop` against a list of `len` items into an inclusive
/// index range, or `None` when the range is empty.
fn index_range(len: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let len = len as i64;

    let start = if start < 0 { len + start } else { start }.max(0);
    let stop = if stop < 0 { len + stop } else { stop }.min(len - 1);

    if start > stop || start >= len {
        return None;
    }

    Some((start as usize, stop as usize))
}
