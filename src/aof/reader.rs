//! AOF reader
//!
//! Loads the AOF file and splits it back into command frames.

use super::AofError;
use crate::protocol::{RespParser, RespValue};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// AOF reader
pub struct AofReader {
    data: Vec<u8>,
}

impl AofReader {
    /// Load AOF file
    ///
    /// A missing file is an empty log.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AofError> {
        let data = match fs::read(path.as_ref()) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No AOF at {:?}, starting empty", path.as_ref());
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(AofReader { data })
    }

    /// Wrap bytes that are already in memory
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        AofReader { data: data.into() }
    }

    /// Iterate over the command frames in the log, in append order
    pub fn frames(&self) -> AofFrames<'_> {
        AofFrames {
            data: &self.data,
            offset: 0,
            done: false,
        }
    }

    /// Get the total size of the AOF data
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Iterator over the command frames of a loaded AOF
///
/// Yields at most one error, then stops.
pub struct AofFrames<'a> {
    data: &'a [u8],
    offset: usize,
    done: bool,
}

impl AofFrames<'_> {
    /// Byte offset of the next unread record
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn fail(&mut self, error: AofError) -> Option<Result<RespValue, AofError>> {
        self.done = true;
        Some(Err(error))
    }
}

impl Iterator for AofFrames<'_> {
    type Item = Result<RespValue, AofError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.offset >= self.data.len() {
            return None;
        }

        let offset = self.offset;
        match RespParser::parse(&self.data[offset..]) {
            Ok(Some((frame, consumed))) => {
                if frame.as_array().is_none() {
                    return self.fail(AofError::Malformed {
                        offset,
                        reason: "record is not a command array".to_string(),
                    });
                }
                self.offset += consumed;
                Some(Ok(frame))
            }
            Ok(None) => self.fail(AofError::Truncated { offset }),
            Err(e) => self.fail(AofError::Malformed {
                offset,
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aof::{AofWriter, SyncPolicy};

    #[test]
    fn test_load_and_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reader.aof");

        // Write some entries
        let writer = AofWriter::new(&path, SyncPolicy::Always).unwrap();
        writer.append(&RespValue::command(["SET", "key1", "value1"])).unwrap();
        writer.append(&RespValue::command(["RPUSH", "list", "a", "b"])).unwrap();

        // Read back
        let reader = AofReader::load(&path).unwrap();
        let frames: Vec<RespValue> = reader.frames().collect::<Result<_, _>>().unwrap();

        assert_eq!(
            frames,
            vec![
                RespValue::command(["SET", "key1", "value1"]),
                RespValue::command(["RPUSH", "list", "a", "b"]),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reader = AofReader::load(dir.path().join("absent.aof")).unwrap();

        assert_eq!(reader.size(), 0);
        assert_eq!(reader.frames().count(), 0);
    }

    #[test]
    fn test_truncated_tail() {
        let reader = AofReader::from_bytes(&b"*1\r\n$4\r\nPING\r\n*2\r\n$3\r\nDEL\r\n$1"[..]);
        let mut frames = reader.frames();

        assert_eq!(frames.next().unwrap().unwrap(), RespValue::command(["PING"]));
        assert!(matches!(
            frames.next(),
            Some(Err(AofError::Truncated { offset: 14 }))
        ));
        assert!(frames.next().is_none());
    }

    #[test]
    fn test_garbage_is_malformed() {
        let reader = AofReader::from_bytes(&b"+OK\r\n"[..]);
        assert!(matches!(
            reader.frames().next(),
            Some(Err(AofError::Malformed { offset: 0, .. }))
        ));

        let reader = AofReader::from_bytes(&b"hello\r\n"[..]);
        assert!(matches!(
            reader.frames().next(),
            Some(Err(AofError::Malformed { offset: 0, .. }))
        ));
    }
}
