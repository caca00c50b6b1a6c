//! Value types for the key-value store

use bytes::Bytes;
use std::collections::VecDeque;

/// Represents the different types of values that can be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// String value (binary-safe)
    String(Bytes),

    /// Integer value (numeric strings and counters)
    Integer(i64),

    /// List of values (ordered)
    List(VecDeque<Bytes>),
}

impl Value {
    /// Create a string value
    pub fn string(bytes: impl Into<Bytes>) -> Self {
        Value::String(bytes.into())
    }

    /// Create an integer value
    pub fn integer(i: i64) -> Self {
        Value::Integer(i)
    }

    /// Create an empty list
    pub fn empty_list() -> Self {
        Value::List(VecDeque::new())
    }

    /// Store client input as an integer when it is the canonical decimal
    /// form of an i64, otherwise as a string.
    ///
    /// `"42"` and `"-7"` become integers; `"007"`, `"+5"` and `"4.2"` stay strings.
    pub fn from_input(bytes: &Bytes) -> Self {
        match parse_canonical_i64(bytes) {
            Some(i) => Value::Integer(i),
            None => Value::String(bytes.clone()),
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::List(_) => "list",
        }
    }

    /// Check if value is a list
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Try to get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as list reference
    pub fn as_list(&self) -> Option<&VecDeque<Bytes>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get as mutable list
    pub fn as_list_mut(&mut self) -> Option<&mut VecDeque<Bytes>> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }
}

fn parse_canonical_i64(bytes: &[u8]) -> Option<i64> {
    let s = std::str::from_utf8(bytes).ok()?;
    let i = s.parse::<i64>().ok()?;
    (i.to_string() == s).then_some(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_numeric() {
        assert_eq!(Value::from_input(&Bytes::from("42")), Value::Integer(42));
        assert_eq!(Value::from_input(&Bytes::from("-7")), Value::Integer(-7));
    }

    #[test]
    fn test_from_input_non_canonical_stays_string() {
        for input in ["007", "+5", "4.2", "", "12abc", "99999999999999999999"] {
            assert_eq!(
                Value::from_input(&Bytes::from(input)),
                Value::String(Bytes::from(input)),
                "input {:?}",
                input
            );
        }
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::string("x").type_name(), "string");
        assert_eq!(Value::integer(1).type_name(), "integer");
        assert_eq!(Value::empty_list().type_name(), "list");
        assert!(Value::empty_list().is_list());
    }
}
