//! RESP2 value types
//!
//! Defines the tagged value model shared by the codec, the command engine
//! and the append-only log.

use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// RESP2 value types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Simple strings: +OK\r\n
    SimpleString(String),

    /// Errors: -KIND message\r\n
    ///
    /// `kind` is empty when the first word of the payload is not upper-case.
    Error { kind: String, message: String },

    /// Integers: :1000\r\n
    ///
    /// `None` is produced when the payload is not a valid i64. The frame is
    /// still consumed.
    Integer(Option<i64>),

    /// Bulk strings: $6\r\nfoobar\r\n, or $-1\r\n when `None`
    BulkString(Option<Bytes>),

    /// Arrays: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n, or *-1\r\n when `None`
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Create a simple string
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Create an error reply
    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        RespValue::Error {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create an integer
    pub fn integer(i: i64) -> Self {
        RespValue::Integer(Some(i))
    }

    /// Create a bulk string from bytes
    pub fn bulk_string(b: impl Into<Bytes>) -> Self {
        RespValue::BulkString(Some(b.into()))
    }

    /// Create a null bulk string
    pub fn null() -> Self {
        RespValue::BulkString(None)
    }

    /// Create an array
    pub fn array(v: Vec<RespValue>) -> Self {
        RespValue::Array(Some(v))
    }

    /// Create a null array
    pub fn null_array() -> Self {
        RespValue::Array(None)
    }

    /// Build a command frame from plain tokens
    pub fn command<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Bytes>,
    {
        RespValue::array(tokens.into_iter().map(RespValue::bulk_string).collect())
    }

    /// Check if this is an error reply
    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error { .. })
    }

    /// Try to extract array elements
    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(Some(arr)) => Some(arr),
            _ => None,
        }
    }

    /// Try to extract bulk string bytes
    pub fn as_bulk_string(&self) -> Option<&Bytes> {
        match self {
            RespValue::BulkString(Some(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Try to extract integer value
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(i) => *i,
            _ => None,
        }
    }

    /// Render the value the way an interactive client prints it
    pub fn to_display_string(&self) -> String {
        let mut out = String::new();
        self.render(&mut out, 0);
        out
    }

    fn render(&self, out: &mut String, depth: usize) {
        match self {
            RespValue::SimpleString(s) => out.push_str(s),
            RespValue::Error { .. } => {
                out.push_str("(error) ");
                out.push_str(&self.to_string());
            }
            RespValue::Integer(Some(i)) => out.push_str(&format!("(integer) {}", i)),
            RespValue::Integer(None) => out.push_str("(integer) ?"),
            RespValue::BulkString(Some(b)) => {
                out.push_str(&format!("\"{}\"", String::from_utf8_lossy(b)))
            }
            RespValue::BulkString(None) | RespValue::Array(None) => out.push_str("(nil)"),
            RespValue::Array(Some(items)) if items.is_empty() => out.push_str("(empty array)"),
            RespValue::Array(Some(items)) => {
                let indent = "   ".repeat(depth);
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push('\n');
                        out.push_str(&indent);
                    }
                    out.push_str(&format!("{}) ", i + 1));
                    item.render(out, depth + 1);
                }
            }
        }
    }
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "{}", s),
            RespValue::Error { kind, message } if kind.is_empty() => write!(f, "{}", message),
            RespValue::Error { kind, message } if message.is_empty() => write!(f, "{}", kind),
            RespValue::Error { kind, message } => write!(f, "{} {}", kind, message),
            RespValue::Integer(Some(i)) => write!(f, "{}", i),
            RespValue::Integer(None) => write!(f, ""),
            RespValue::BulkString(Some(b)) => write!(f, "{}", String::from_utf8_lossy(b)),
            RespValue::BulkString(None) => write!(f, "(nil)"),
            RespValue::Array(Some(arr)) => write!(f, "Array({} elements)", arr.len()),
            RespValue::Array(None) => write!(f, "Array(nil)"),
        }
    }
}

/// RESP parsing errors
///
/// Only structural problems are errors; running out of bytes is reported as
/// `Ok(None)` by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RespError {
    /// Invalid protocol format
    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    /// Invalid UTF-8 in a simple string or error line
    #[error("Invalid UTF-8")]
    InvalidUtf8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_forms_are_distinct() {
        assert_ne!(RespValue::null(), RespValue::bulk_string(""));
        assert_ne!(RespValue::null_array(), RespValue::array(vec![]));
    }

    #[test]
    fn test_error_display() {
        let err = RespValue::error("WRONGTYPE", "Operation against a key holding the wrong kind of value");
        assert_eq!(
            err.to_string(),
            "WRONGTYPE Operation against a key holding the wrong kind of value"
        );
        assert_eq!(RespValue::error("", "oops").to_string(), "oops");
    }

    #[test]
    fn test_display_string_for_cli() {
        assert_eq!(RespValue::integer(5).to_display_string(), "(integer) 5");
        assert_eq!(RespValue::null().to_display_string(), "(nil)");
        assert_eq!(RespValue::bulk_string("hi").to_display_string(), "\"hi\"");

        let list = RespValue::array(vec![
            RespValue::bulk_string("a"),
            RespValue::bulk_string("b"),
        ]);
        assert_eq!(list.to_display_string(), "1) \"a\"\n2) \"b\"");
    }

    #[test]
    fn test_command_builder() {
        let frame = RespValue::command(["SET", "k", "v"]);
        assert_eq!(frame.as_array().map(|a| a.len()), Some(3));
        assert_eq!(frame.as_array().unwrap()[0].as_bulk_string().unwrap(), "SET");
    }
}
