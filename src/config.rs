//! Server configuration
//!
//! Defaults, overlaid by an optional JSON file, overlaid by command-line flags.

use crate::aof::{AofConfig, SyncPolicy};
use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for a server instance
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub bind: String,

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------
    /// AOF location
    pub aof_path: PathBuf,

    /// Log writes and replay them at startup
    pub aof_enabled: bool,

    /// When to fsync the AOF
    pub appendfsync: SyncPolicy,

    /// Start even if the last AOF record was cut short
    pub aof_load_truncated: bool,

    // -------------------------------------------------------------------------
    // Expiry
    // -------------------------------------------------------------------------
    /// Period of the active expiration pass (milliseconds)
    pub sweep_interval_ms: u64,

    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:6379".to_string(),
            aof_path: PathBuf::from("ferrumkv.aof"),
            aof_enabled: true,
            appendfsync: SyncPolicy::EverySecond,
            aof_load_truncated: true,
            sweep_interval_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Read a JSON config file; missing fields keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Build the effective configuration from command-line arguments
    pub fn load(args: &CliArgs) -> anyhow::Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(args);
        Ok(config)
    }

    /// Overlay flags that were given on the command line
    pub fn apply(&mut self, args: &CliArgs) {
        if let Some(bind) = &args.bind {
            self.bind = bind.clone();
        }
        if let Some(path) = &args.aof_path {
            self.aof_path = path.clone();
        }
        if args.no_aof {
            self.aof_enabled = false;
        }
        if let Some(policy) = args.appendfsync {
            self.appendfsync = policy;
        }
        if let Some(level) = &args.log_level {
            self.log_level = level.clone();
        }
    }

    /// AOF settings derived from this config
    pub fn aof_config(&self) -> AofConfig {
        AofConfig {
            path: self.aof_path.clone(),
            sync_policy: self.appendfsync,
            enabled: self.aof_enabled,
            load_truncated: self.aof_load_truncated,
        }
    }

    /// Period of the active expiration pass
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

/// Command-line flags of the server binary
#[derive(Parser, Debug, Default)]
#[command(name = "ferrumkv")]
#[command(about = "In-memory key-value server speaking RESP, with AOF persistence")]
pub struct CliArgs {
    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:6379
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Append-only file location
    #[arg(long)]
    pub aof_path: Option<PathBuf>,

    /// Run without persistence
    #[arg(long)]
    pub no_aof: bool,

    /// AOF fsync policy: always, everysec or no
    #[arg(long)]
    pub appendfsync: Option<SyncPolicy>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind, "127.0.0.1:6379");
        assert_eq!(config.appendfsync, SyncPolicy::EverySecond);
        assert_eq!(config.sweep_interval(), Duration::from_secs(1));

        let aof = config.aof_config();
        assert!(aof.enabled);
        assert!(aof.load_truncated);
        assert_eq!(aof.path, PathBuf::from("ferrumkv.aof"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"bind": "0.0.0.0:7000", "appendfsync": "always"}"#).unwrap();

        assert_eq!(config.bind, "0.0.0.0:7000");
        assert_eq!(config.appendfsync, SyncPolicy::Always);
        assert!(config.aof_enabled);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(serde_json::from_str::<Config>(r#"{"port": 1}"#).is_err());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ferrumkv.json");
        fs::write(
            &path,
            r#"{"bind": "0.0.0.0:7000", "aof_path": "/var/lib/file.aof", "log_level": "debug"}"#,
        )
        .unwrap();

        let args = CliArgs::parse_from([
            "ferrumkv",
            "--config",
            path.to_str().unwrap(),
            "--bind",
            "127.0.0.1:7001",
            "--no-aof",
            "--appendfsync",
            "no",
        ]);
        let config = Config::load(&args).unwrap();

        assert_eq!(config.bind, "127.0.0.1:7001");
        assert_eq!(config.aof_path, PathBuf::from("/var/lib/file.aof"));
        assert!(!config.aof_enabled);
        assert_eq!(config.appendfsync, SyncPolicy::No);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_missing_file_is_error() {
        let args = CliArgs {
            config: Some(PathBuf::from("/nonexistent/ferrumkv.json")),
            ..CliArgs::default()
        };
        assert!(Config::load(&args).is_err());
    }
}
