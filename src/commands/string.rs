//! String commands (SET, GET)

use super::{Command, CommandContext, not_integer, parse_integer, wrong_arity, wrong_type};
use crate::protocol::RespValue;
use crate::store::{Entry, Value};
use bytes::Bytes;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// SET command - Set a key to a value
///
/// Syntax: SET key value [EX seconds | PX milliseconds | EXAT unix-seconds | PXAT unix-milliseconds]
///
/// Values that are the canonical form of an integer are stored as integers.
pub struct SetCommand;

impl Command for SetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        let expire_at = match args.len() {
            2 => None,
            4 => match expiry_from_option(&args[2], &args[3]) {
                Ok(at) => Some(at),
                Err(reply) => return reply,
            },
            _ => return wrong_arity(self.name()),
        };

        let entry = Entry {
            value: Value::from_input(&args[1]),
            expire_at,
        };
        ctx.store.set(args[0].clone(), entry);

        RespValue::simple_string("OK")
    }

    fn name(&self) -> &'static str {
        "SET"
    }

    fn min_args(&self) -> usize {
        2
    }

    fn max_args(&self) -> Option<usize> {
        Some(4)
    }

    fn is_write(&self) -> bool {
        true
    }
}

/// Turn an expiry option and its amount into an absolute instant
fn expiry_from_option(option: &Bytes, amount: &Bytes) -> Result<SystemTime, RespValue> {
    let option = String::from_utf8_lossy(option).to_uppercase();
    if !matches!(option.as_str(), "EX" | "PX" | "EXAT" | "PXAT") {
        return Err(wrong_arity("set"));
    }

    let amount = parse_integer(amount)?;
    if amount <= 0 {
        return Err(invalid_expire_time());
    }
    let amount = amount as u64;

    let at = match option.as_str() {
        "EX" => SystemTime::now().checked_add(Duration::from_secs(amount)),
        "PX" => SystemTime::now().checked_add(Duration::from_millis(amount)),
        "EXAT" => UNIX_EPOCH.checked_add(Duration::from_secs(amount)),
        _ => UNIX_EPOCH.checked_add(Duration::from_millis(amount)),
    };

    at.ok_or_else(not_integer)
}

fn invalid_expire_time() -> RespValue {
    RespValue::error("ERR", "invalid expire time in 'set' command")
}

/// GET command - Get the value of a key
///
/// Syntax: GET key
pub struct GetCommand;

impl Command for GetCommand {
    fn execute(&self, ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        ctx.store.read(&args[0], |entry| match entry.map(|e| &e.value) {
            Some(Value::String(bytes)) => RespValue::bulk_string(bytes.clone()),
            Some(Value::Integer(i)) => RespValue::integer(*i),
            Some(Value::List(_)) => wrong_type(),
            None => RespValue::null(),
        })
    }

    fn name(&self) -> &'static str {
        "GET"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::args;

    #[test]
    fn test_set_get() {
        let ctx = CommandContext::new();

        let result = SetCommand.execute(&ctx, &args(&["mykey", "myvalue"]));
        assert_eq!(result, RespValue::simple_string("OK"));

        let result = GetCommand.execute(&ctx, &args(&["mykey"]));
        assert_eq!(result, RespValue::bulk_string("myvalue"));
    }

    #[test]
    fn test_set_numeric_reads_back_as_integer() {
        let ctx = CommandContext::new();
        SetCommand.execute(&ctx, &args(&["n", "42"]));

        assert_eq!(GetCommand.execute(&ctx, &args(&["n"])), RespValue::integer(42));
    }

    #[test]
    fn test_get_nonexistent() {
        let ctx = CommandContext::new();
        let result = GetCommand.execute(&ctx, &args(&["nonexistent"]));
        assert_eq!(result, RespValue::null());
    }

    #[test]
    fn test_get_list_is_wrong_type() {
        let ctx = CommandContext::new();
        ctx.store.set("l", Entry::new(Value::empty_list()));

        assert_eq!(GetCommand.execute(&ctx, &args(&["l"])), wrong_type());
    }

    #[test]
    fn test_set_with_px_expires() {
        let ctx = CommandContext::new();
        SetCommand.execute(&ctx, &args(&["k", "v", "px", "100"]));
        assert_eq!(GetCommand.execute(&ctx, &args(&["k"])), RespValue::bulk_string("v"));

        std::thread::sleep(Duration::from_millis(250));
        assert_eq!(GetCommand.execute(&ctx, &args(&["k"])), RespValue::null());
    }

    #[test]
    fn test_set_with_absolute_expiry() {
        let ctx = CommandContext::new();
        let future = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;

        SetCommand.execute(&ctx, &args(&["later", "v", "EXAT", &future.to_string()]));
        assert_eq!(GetCommand.execute(&ctx, &args(&["later"])), RespValue::bulk_string("v"));

        SetCommand.execute(&ctx, &args(&["past", "v", "PXAT", "1000"]));
        assert_eq!(GetCommand.execute(&ctx, &args(&["past"])), RespValue::null());
    }

    #[test]
    fn test_set_overwrites_ttl() {
        let ctx = CommandContext::new();
        SetCommand.execute(&ctx, &args(&["k", "v", "EX", "100"]));
        SetCommand.execute(&ctx, &args(&["k", "w"]));

        assert_eq!(ctx.store.get(b"k").unwrap().expire_at, None);
    }

    #[test]
    fn test_set_option_errors() {
        let ctx = CommandContext::new();

        assert_eq!(
            SetCommand.execute(&ctx, &args(&["k", "v", "EX"])),
            wrong_arity("set")
        );
        assert_eq!(
            SetCommand.execute(&ctx, &args(&["k", "v", "XX", "10"])),
            wrong_arity("set")
        );
        assert_eq!(
            SetCommand.execute(&ctx, &args(&["k", "v", "EX", "ten"])),
            not_integer()
        );
        assert_eq!(
            SetCommand.execute(&ctx, &args(&["k", "v", "EX", "0"])),
            invalid_expire_time()
        );
        assert!(!ctx.store.contains(b"k"));
    }
}
