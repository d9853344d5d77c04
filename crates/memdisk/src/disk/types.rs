//! Core disk types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of object stored under a path key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Storage class of a disk implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DiskType {
    /// Volatile, process-local memory.
    Memory,
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Full normalized path of the entry.
    pub path: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, path: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind,
        }
    }
}

/// Space figures for a disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskStats {
    /// Total capacity in bytes (`u64::MAX` when unbounded).
    pub total_bytes: u64,
    /// Bytes held by file contents. Hard links count once.
    pub used_bytes: u64,
    /// Bytes claimed by live reservations.
    pub reserved_bytes: u64,
    /// Number of path keys, root included.
    pub entries: u64,
}

/// How a write stream commits its staged bytes.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum WriteMode {
    /// Replace the file contents.
    #[default]
    Rewrite,
    /// Append to the existing contents.
    Append,
}

/// Default I/O buffer size hint.
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Settings forwarded to read streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSettings {
    /// Buffer size hint for callers wrapping the stream.
    pub buffer_size: usize,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl ReadSettings {
    /// Set the buffer size hint.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

/// Settings forwarded to write streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSettings {
    /// Commit mode applied on finalize.
    pub mode: WriteMode,
    /// Buffer size hint for callers wrapping the stream.
    pub buffer_size: usize,
}

impl Default for WriteSettings {
    fn default() -> Self {
        Self {
            mode: WriteMode::Rewrite,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl WriteSettings {
    /// Rewrite mode (the default).
    pub fn rewrite() -> Self {
        Self::default()
    }

    /// Append mode.
    pub fn append() -> Self {
        Self {
            mode: WriteMode::Append,
            ..Default::default()
        }
    }

    /// Set the buffer size hint.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_file_type() {
        assert!(FileType::File.is_file());
        assert!(!FileType::File.is_dir());
        assert!(FileType::Directory.is_dir());
        assert_eq!(FileType::Directory.to_string(), "directory");
    }

    #[test]
    fn test_disk_type_strings() {
        assert_eq!(DiskType::Memory.to_string(), "memory");
        assert_eq!(DiskType::from_str("memory").unwrap(), DiskType::Memory);
    }

    #[test]
    fn test_write_settings() {
        assert_eq!(WriteSettings::default().mode, WriteMode::Rewrite);
        let append = WriteSettings::append().with_buffer_size(16);
        assert_eq!(append.mode, WriteMode::Append);
        assert_eq!(append.buffer_size, 16);
        assert_eq!(WriteMode::from_str("append").unwrap(), WriteMode::Append);
    }
}
