//! Re-openable byte sources
//!
//! Both scan passes traverse the input from the start, so a source hands out a
//! fresh reader every time it is opened:
//! - `FileSource` reopens the file on disk for each pass
//! - `MemorySource` wraps shared in-memory bytes (tests, embedding callers)

use crate::error::{Result, WmipfError};
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::PathBuf;
use std::sync::Arc;

/// A byte source that can be read from the beginning any number of times
pub trait ByteSource {
    /// Open a new sequential reader positioned at offset 0
    fn open(&self) -> Result<Box<dyn BufRead + '_>>;

    /// Human-readable description used in logs and reports
    fn describe(&self) -> String;
}

/// Raw repository file on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ByteSource for FileSource {
    fn open(&self) -> Result<Box<dyn BufRead + '_>> {
        let file = File::open(&self.path).map_err(|e| WmipfError::Io {
            source: e,
            context: format!("Failed to open input file: {:?}", self.path),
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory bytes; clones share the same buffer
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl ByteSource for MemorySource {
    fn open(&self) -> Result<Box<dyn BufRead + '_>> {
        Ok(Box::new(Cursor::new(&self.bytes[..])))
    }

    fn describe(&self) -> String {
        format!("<memory: {} bytes>", self.bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_memory_source_reopens_from_start() {
        let source = MemorySource::from(b"abc\ndef".to_vec());

        let mut first = String::new();
        source.open().unwrap().read_to_string(&mut first).unwrap();
        let mut second = String::new();
        source.open().unwrap().read_to_string(&mut second).unwrap();

        assert_eq!(first, "abc\ndef");
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let source = FileSource::new("/definitely/not/here/OBJECTS.DATA");
        match source.open() {
            Err(WmipfError::Io { context, .. }) => assert!(context.contains("OBJECTS.DATA")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("open should fail"),
        };
    }
}
