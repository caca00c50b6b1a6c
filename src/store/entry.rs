//! Entry structure for stored values

use super::value::Value;
use std::time::{Duration, SystemTime};

/// Represents a single entry in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The value
    pub value: Value,

    /// Optional expiration time (absolute, wall clock)
    pub expire_at: Option<SystemTime>,
}

impl Entry {
    /// Create a new entry without expiration
    pub fn new(value: Value) -> Self {
        Entry {
            value,
            expire_at: None,
        }
    }

    /// Create a new entry expiring at an absolute instant
    pub fn with_expiry(value: Value, expire_at: SystemTime) -> Self {
        Entry {
            value,
            expire_at: Some(expire_at),
        }
    }

    /// Create a new entry expiring after `ttl`
    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        Self::with_expiry(value, SystemTime::now() + ttl)
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }

    /// Check if the entry has expired as of `now`
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        match self.expire_at {
            Some(expire_at) => now >= expire_at,
            None => false,
        }
    }
}
