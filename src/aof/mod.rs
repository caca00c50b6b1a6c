//! Append-Only File (AOF) persistence module
//!
//! Provides durability by logging every successful write command to disk.
//! Records are the commands themselves, RESP-encoded exactly as they were
//! received, so the file is replayed with the same codec that frames
//! network traffic.

mod writer;
mod reader;
mod replay;

pub use writer::AofWriter;
pub use reader::{AofFrames, AofReader};
pub use replay::{replay, ReplayStats};

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// AOF sync policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SyncPolicy {
    /// Sync after every write (safest, slowest)
    #[serde(rename = "always")]
    Always,
    /// Sync every second (balanced)
    #[serde(rename = "everysec")]
    EverySecond,
    /// Let the OS decide when to sync (fastest, least safe)
    #[serde(rename = "no")]
    No,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy::EverySecond
    }
}

impl FromStr for SyncPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(SyncPolicy::Always),
            "everysec" => Ok(SyncPolicy::EverySecond),
            "no" => Ok(SyncPolicy::No),
            other => Err(format!(
                "unknown sync policy '{}', expected always, everysec or no",
                other
            )),
        }
    }
}

impl fmt::Display for SyncPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPolicy::Always => "always",
            SyncPolicy::EverySecond => "everysec",
            SyncPolicy::No => "no",
        };
        write!(f, "{}", name)
    }
}

/// AOF configuration
#[derive(Debug, Clone)]
pub struct AofConfig {
    /// Path to the AOF file
    pub path: PathBuf,
    /// Sync policy
    pub sync_policy: SyncPolicy,
    /// Whether to enable AOF
    pub enabled: bool,
    /// Accept a log whose last record was cut short
    pub load_truncated: bool,
}

impl Default for AofConfig {
    fn default() -> Self {
        AofConfig {
            path: PathBuf::from("ferrumkv.aof"),
            sync_policy: SyncPolicy::default(),
            enabled: true,
            load_truncated: true,
        }
    }
}

/// AOF errors
#[derive(Debug, Error)]
pub enum AofError {
    #[error("AOF I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed AOF record at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("AOF truncated: incomplete record at byte {offset}")]
    Truncated { offset: usize },

    #[error("AOF command #{index} failed on replay: {reply}")]
    CommandFailed { index: usize, reply: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_policy_names() {
        for policy in [SyncPolicy::Always, SyncPolicy::EverySecond, SyncPolicy::No] {
            assert_eq!(policy.to_string().parse::<SyncPolicy>(), Ok(policy));
        }
        assert!("sometimes".parse::<SyncPolicy>().is_err());
    }

    #[test]
    fn test_sync_policy_deserialize() {
        let policy: SyncPolicy = serde_json::from_str("\"everysec\"").unwrap();
        assert_eq!(policy, SyncPolicy::EverySecond);
    }
}
