//! AOF replay
//!
//! Rebuilds the store by running every logged command again through the
//! command engine, with persistence switched off.

use super::{AofError, AofReader};
use crate::dispatch::Dispatcher;
use crate::store::MemoryStore;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Summary of a successful replay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Commands applied
    pub commands: usize,
    /// Bytes of the log that were applied
    pub bytes: usize,
    /// Whether an incomplete trailing record was dropped
    pub truncated: bool,
}

/// Replay the AOF at `path` into a fresh store
///
/// The store is only returned when every record applied cleanly; any error
/// reply from a replayed command aborts the whole replay. An incomplete last
/// record is dropped with a warning when `load_truncated` is set.
pub fn replay<P: AsRef<Path>>(
    path: P,
    load_truncated: bool,
) -> Result<(Arc<MemoryStore>, ReplayStats), AofError> {
    let reader = AofReader::load(path.as_ref())?;
    let dispatcher = Dispatcher::new();
    let mut stats = ReplayStats::default();

    let mut frames = reader.frames();
    while let Some(frame) = frames.next() {
        let frame = match frame {
            Ok(frame) => frame,
            Err(AofError::Truncated { offset }) if load_truncated => {
                warn!(
                    "AOF {:?} ends with an incomplete record at byte {} ({} bytes ignored)",
                    path.as_ref(),
                    offset,
                    reader.size() - offset
                );
                stats.truncated = true;
                break;
            }
            Err(e) => return Err(e),
        };

        let reply = dispatcher.execute(&frame);
        if reply.is_error() {
            return Err(AofError::CommandFailed {
                index: stats.commands,
                reply: reply.to_string(),
            });
        }

        stats.commands += 1;
        stats.bytes = frames.offset();
    }

    info!(
        "Replayed {} commands ({} bytes) from {:?}",
        stats.commands,
        stats.bytes,
        path.as_ref()
    );

    Ok((dispatcher.store().clone(), stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aof::{AofWriter, SyncPolicy};
    use crate::protocol::RespValue;
    use std::fs;

    fn write_log(path: &Path, commands: &[&[&'static str]]) {
        let writer = AofWriter::new(path, SyncPolicy::Always).unwrap();
        for command in commands {
            writer.append(&RespValue::command(command.iter().copied())).unwrap();
        }
    }

    #[test]
    fn test_replay_rebuilds_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.aof");
        write_log(
            &path,
            &[
                &["SET", "key1", "value1"],
                &["SET", "key2", "value2"],
                &["INCR", "counter"],
                &["INCR", "counter"],
                &["RPUSH", "list", "a", "b"],
                &["DEL", "key1"],
            ],
        );

        let (store, stats) = replay(&path, false).unwrap();
        assert_eq!(stats.commands, 6);
        assert_eq!(stats.bytes as u64, fs::metadata(&path).unwrap().len());
        assert!(!stats.truncated);

        let dispatcher = Dispatcher::with_store(store);
        assert_eq!(
            dispatcher.execute(&RespValue::command(["GET", "key1"])),
            RespValue::null()
        );
        assert_eq!(
            dispatcher.execute(&RespValue::command(["GET", "key2"])),
            RespValue::bulk_string("value2")
        );
        assert_eq!(
            dispatcher.execute(&RespValue::command(["GET", "counter"])),
            RespValue::integer(2)
        );
    }

    #[test]
    fn test_replay_does_not_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stable.aof");
        write_log(&path, &[&["SET", "a", "1"]]);
        let before = fs::read(&path).unwrap();

        replay(&path, false).unwrap();

        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_replay_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (store, stats) = replay(dir.path().join("none.aof"), false).unwrap();

        assert!(store.is_empty());
        assert_eq!(stats, ReplayStats::default());
    }

    #[test]
    fn test_replay_fails_on_command_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.aof");
        write_log(
            &path,
            &[&["LPUSH", "l", "a"], &["SET", "ok", "1"], &["INCR", "l"]],
        );

        match replay(&path, true) {
            Err(AofError::CommandFailed { index, reply }) => {
                assert_eq!(index, 2);
                assert!(reply.starts_with("WRONGTYPE"));
            }
            other => panic!("expected replay failure, got {:?}", other.map(|(_, s)| s)),
        }
    }

    #[test]
    fn test_relative_expiry_restarts_at_replay_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ttl.aof");

        // At runtime the LPUSH came after k had expired; replay re-arms the
        // PX from replay time, so k is still a string when LPUSH runs.
        write_log(
            &path,
            &[&["SET", "k", "v", "PX", "60000"], &["LPUSH", "k", "a"]],
        );

        match replay(&path, true) {
            Err(AofError::CommandFailed { index, reply }) => {
                assert_eq!(index, 1);
                assert!(reply.starts_with("WRONGTYPE"));
            }
            other => panic!("expected replay failure, got {:?}", other.map(|(_, s)| s)),
        }
    }

    #[test]
    fn test_replay_truncated_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.aof");
        write_log(&path, &[&["SET", "a", "1"]]);

        let mut data = fs::read(&path).unwrap();
        data.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$1\r\nb");
        fs::write(&path, &data).unwrap();

        let (store, stats) = replay(&path, true).unwrap();
        assert!(stats.truncated);
        assert_eq!(stats.commands, 1);
        assert!(store.contains(b"a"));
        assert!(!store.contains(b"b"));

        assert!(matches!(
            replay(&path, false),
            Err(AofError::Truncated { .. })
        ));
    }
}
