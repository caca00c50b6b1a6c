//! Connection commands (PING, ECHO)

use super::{Command, CommandContext};
use crate::protocol::RespValue;
use bytes::Bytes;

/// PING command - Test the connection
///
/// Syntax: PING [message]
pub struct PingCommand;

impl Command for PingCommand {
    fn execute(&self, _ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        match args.first() {
            Some(message) => RespValue::bulk_string(message.clone()),
            None => RespValue::simple_string("PONG"),
        }
    }

    fn name(&self) -> &'static str {
        "PING"
    }

    fn max_args(&self) -> Option<usize> {
        Some(1)
    }
}

/// ECHO command - Return the given message
///
/// Syntax: ECHO message
pub struct EchoCommand;

impl Command for EchoCommand {
    fn execute(&self, _ctx: &CommandContext, args: &[Bytes]) -> RespValue {
        RespValue::bulk_string(args[0].clone())
    }

    fn name(&self) -> &'static str {
        "ECHO"
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
    fn test_ping() {
        let ctx = CommandContext::new();
        assert_eq!(
            PingCommand.execute(&ctx, &[]),
            RespValue::simple_string("PONG")
        );
        assert_eq!(
            PingCommand.execute(&ctx, &args(&["Hello"])),
            RespValue::bulk_string("Hello")
        );
    }

    #[test]
    fn test_echo() {
        let ctx = CommandContext::new();
        assert_eq!(
            EchoCommand.execute(&ctx, &args(&["Hello"])),
            RespValue::bulk_string("Hello")
        );
    }
}
