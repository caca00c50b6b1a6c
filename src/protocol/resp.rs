//! RESP2 parser and encoder
//!
//! Implements parsing from bytes to RespValue and encoding from RespValue to bytes.
//! The parser never mutates its input: it reports how many bytes a complete
//! frame used and leaves it to the caller to drop them.

use super::types::{RespError, RespValue};
use bytes::{BufMut, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";

/// Nested arrays deeper than this are rejected instead of recursing further
const MAX_DEPTH: usize = 512;

/// Decode one frame from the front of `buf`.
///
/// Returns the value and the number of bytes it occupied, or `(None, 0)`
/// when the buffer does not start with a complete, well-formed frame.
pub fn decode(buf: &[u8]) -> (Option<RespValue>, usize) {
    match RespParser::parse(buf) {
        Ok(Some((value, consumed))) => (Some(value), consumed),
        Ok(None) | Err(_) => (None, 0),
    }
}

/// Encode a value into its wire form
pub fn encode(value: &RespValue) -> Bytes {
    RespEncoder::encode(value)
}

/// RESP2 Parser
pub struct RespParser;

impl RespParser {
    /// Parse a RESP value from the front of a buffer
    ///
    /// Returns Ok(Some((value, consumed))) if a complete value was parsed,
    /// Ok(None) if more data is needed,
    /// Err(e) if the bytes can never form a valid frame
    pub fn parse(buf: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
        Self::parse_at_depth(buf, 0)
    }

    fn parse_at_depth(buf: &[u8], depth: usize) -> Result<Option<(RespValue, usize)>, RespError> {
        let first_byte = match buf.first() {
            Some(b) => *b,
            None => return Ok(None),
        };

        if !matches!(first_byte, b'+' | b'-' | b':' | b'$' | b'*') {
            return Err(RespError::InvalidProtocol(format!(
                "Unknown type prefix: {:?}",
                first_byte as char
            )));
        }

        let line_end = match Self::find_crlf(buf) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        let line = &buf[1..line_end];
        let header_len = line_end + CRLF.len();

        match first_byte {
            b'+' => Self::parse_simple_string(line, header_len),
            b'-' => Self::parse_error(line, header_len),
            b':' => Ok(Some((Self::parse_integer(line), header_len))),
            b'$' => Self::parse_bulk_string(buf, line, header_len),
            _ => Self::parse_array(buf, line, header_len, depth),
        }
    }

    /// Parse simple string: +OK\r\n
    fn parse_simple_string(
        line: &[u8],
        header_len: usize,
    ) -> Result<Option<(RespValue, usize)>, RespError> {
        let s = std::str::from_utf8(line).map_err(|_| RespError::InvalidUtf8)?;
        Ok(Some((RespValue::SimpleString(s.to_string()), header_len)))
    }

    /// Parse error: -ERR message\r\n
    fn parse_error(line: &[u8], header_len: usize) -> Result<Option<(RespValue, usize)>, RespError> {
        let s = std::str::from_utf8(line).map_err(|_| RespError::InvalidUtf8)?;
        let (first, rest) = s.split_once(' ').unwrap_or((s, ""));

        let value = if is_error_kind(first) {
            RespValue::error(first, rest)
        } else {
            RespValue::error("", s)
        };
        Ok(Some((value, header_len)))
    }

    /// Parse integer: :1000\r\n
    ///
    /// A payload that is not a decimal i64 yields `Integer(None)`.
    fn parse_integer(line: &[u8]) -> RespValue {
        let value = std::str::from_utf8(line)
            .ok()
            .and_then(|s| s.parse::<i64>().ok());
        RespValue::Integer(value)
    }

    /// Parse bulk string: $6\r\nfoobar\r\n or $-1\r\n (null)
    fn parse_bulk_string(
        buf: &[u8],
        line: &[u8],
        header_len: usize,
    ) -> Result<Option<(RespValue, usize)>, RespError> {
        let len = Self::parse_length(line, "bulk string length")?;

        if len == -1 {
            return Ok(Some((RespValue::null(), header_len)));
        }

        if len < 0 {
            return Err(RespError::InvalidProtocol(format!(
                "Invalid bulk string length: {}",
                len
            )));
        }

        let len = len as usize;
        let total_len = header_len + len + CRLF.len();

        if buf.len() < total_len {
            // Not enough data yet
            return Ok(None);
        }

        let data = &buf[header_len..header_len + len];
        if &buf[header_len + len..total_len] != CRLF {
            return Err(RespError::InvalidProtocol(
                "Missing CRLF after bulk string data".to_string(),
            ));
        }

        Ok(Some((RespValue::bulk_string(Bytes::copy_from_slice(data)), total_len)))
    }

    /// Parse array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n or *-1\r\n (null)
    fn parse_array(
        buf: &[u8],
        line: &[u8],
        header_len: usize,
        depth: usize,
    ) -> Result<Option<(RespValue, usize)>, RespError> {
        let count = Self::parse_length(line, "array count")?;

        if count == -1 {
            return Ok(Some((RespValue::null_array(), header_len)));
        }

        if count < 0 {
            return Err(RespError::InvalidProtocol(format!(
                "Invalid array count: {}",
                count
            )));
        }

        if depth >= MAX_DEPTH {
            return Err(RespError::InvalidProtocol("Array nesting too deep".to_string()));
        }

        // Elements are only accepted once every one of them is complete, so a
        // partial array never leaks out as standalone values.
        let count = count as usize;
        let mut elements = Vec::with_capacity(count.min(1024));
        let mut offset = header_len;

        for _ in 0..count {
            match Self::parse_at_depth(&buf[offset..], depth + 1)? {
                Some((value, consumed)) => {
                    elements.push(value);
                    offset += consumed;
                }
                None => return Ok(None),
            }
        }

        Ok(Some((RespValue::array(elements), offset)))
    }

    fn parse_length(line: &[u8], what: &str) -> Result<i64, RespError> {
        std::str::from_utf8(line)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| {
                RespError::InvalidProtocol(format!(
                    "Invalid {}: {:?}",
                    what,
                    String::from_utf8_lossy(line)
                ))
            })
    }

    fn find_crlf(buf: &[u8]) -> Option<usize> {
        buf.windows(CRLF.len()).position(|w| w == CRLF)
    }
}

/// An error payload's first word is its kind when it is entirely upper-case
fn is_error_kind(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}

/// RESP2 Encoder
pub struct RespEncoder;

impl RespEncoder {
    /// Encode a RESP value to bytes
    pub fn encode(value: &RespValue) -> Bytes {
        let mut buf = BytesMut::new();
        Self::encode_to(&mut buf, value);
        buf.freeze()
    }

    /// Encode a RESP value into an existing buffer
    pub fn encode_to(buf: &mut BytesMut, value: &RespValue) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(CRLF);
            }
            RespValue::Error { .. } => {
                buf.put_u8(b'-');
                buf.put_slice(value.to_string().as_bytes());
                buf.put_slice(CRLF);
            }
            RespValue::Integer(i) => {
                buf.put_u8(b':');
                if let Some(i) = i {
                    buf.put_slice(i.to_string().as_bytes());
                }
                buf.put_slice(CRLF);
            }
            RespValue::BulkString(Some(bytes)) => {
                buf.put_u8(b'$');
                buf.put_slice(bytes.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                buf.put_slice(bytes);
                buf.put_slice(CRLF);
            }
            RespValue::BulkString(None) => {
                buf.put_slice(b"$-1\r\n");
            }
            RespValue::Array(Some(arr)) => {
                buf.put_u8(b'*');
                buf.put_slice(arr.len().to_string().as_bytes());
                buf.put_slice(CRLF);
                for elem in arr {
                    Self::encode_to(buf, elem);
                }
            }
            RespValue::Array(None) => {
                buf.put_slice(b"*-1\r\n");
            }
        }
    }
}
