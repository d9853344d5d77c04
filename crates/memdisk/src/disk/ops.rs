//! Disk operations trait.
//!
//! This is the contract storage-engine code is written against. It is
//! path-based and synchronous; implementations decide how (and whether)
//! anything reaches real storage.

use std::io::{Read, Seek, Write};
use std::time::SystemTime;

use super::iter::DirectoryIterator;
use super::types::{DiskStats, DiskType, ReadSettings, WriteSettings};
use super::DiskResult;

/// Sequential read handle over one file.
pub trait FileReader: Read + Seek + Send {
    /// Normalized path the reader was opened on.
    fn file_name(&self) -> &str;

    /// Current read offset.
    fn position(&self) -> u64;

    /// Current length of the file.
    fn size(&self) -> u64;
}

/// Write handle over one file.
///
/// Bytes written are staged privately and only become visible after
/// [`FileWriter::finalize`]. Dropping an unfinalized writer discards them.
pub trait FileWriter: Write + Send {
    /// Normalized path the writer was opened on.
    fn file_name(&self) -> &str;

    /// Commit the staged bytes. Calling it again is a no-op.
    fn finalize(&mut self) -> DiskResult<()>;

    /// Returns true once the writer has committed.
    fn is_finalized(&self) -> bool;

    /// Flush to durable storage, where the implementation has any.
    fn sync(&mut self) -> DiskResult<()>;
}

/// Claim on a disk's free space, released when dropped.
pub trait Reservation: Send {
    /// Reserved bytes.
    fn size(&self) -> u64;

    /// Grow or shrink the claim.
    fn update(&mut self, new_size: u64) -> DiskResult<()>;
}

/// Core disk operations trait.
///
/// Paths are `/`-separated and relative to the disk root; a leading `/`
/// is accepted and ignored. Errors are never retried by implementations.
pub trait Disk: Send + Sync {
    // ========================================================================
    // Identity
    // ========================================================================

    /// Process-unique identifier.
    fn id(&self) -> u64;

    /// Disk name.
    fn name(&self) -> &str;

    /// Root path, for display.
    fn path(&self) -> &str;

    /// Storage class.
    fn disk_type(&self) -> DiskType;

    // ========================================================================
    // Space
    // ========================================================================

    /// Reserve `bytes` of free space.
    fn reserve(&self, bytes: u64) -> DiskResult<Box<dyn Reservation>>;

    /// Total capacity in bytes.
    fn get_total_space(&self) -> u64;

    /// Capacity not taken by file contents.
    fn get_available_space(&self) -> u64;

    /// Available capacity not claimed by reservations.
    fn get_unreserved_space(&self) -> u64;

    /// Snapshot of all space figures.
    fn stats(&self) -> DiskStats;

    // ========================================================================
    // Queries
    // ========================================================================

    /// Returns true if anything exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Returns true if `path` is a file.
    fn is_file(&self, path: &str) -> bool;

    /// Returns true if `path` is a directory.
    fn is_directory(&self, path: &str) -> bool;

    /// Length of the file in bytes.
    fn get_file_size(&self, path: &str) -> DiskResult<u64>;

    /// Names of the immediate children of a directory, sorted.
    fn list_files(&self, path: &str) -> DiskResult<Vec<String>>;

    /// Iterator over the immediate children of a directory.
    fn iterate_directory(&self, path: &str) -> DiskResult<DirectoryIterator>;

    // ========================================================================
    // Directories
    // ========================================================================

    /// Create one directory. The parent must exist.
    fn create_directory(&self, path: &str) -> DiskResult<()>;

    /// Create a directory and any missing ancestors.
    fn create_directories(&self, path: &str) -> DiskResult<()>;

    /// Remove the immediate children of a directory.
    fn clear_directory(&self, path: &str) -> DiskResult<()>;

    /// Rename a directory together with everything below it.
    fn move_directory(&self, from: &str, to: &str) -> DiskResult<()>;

    /// Remove an empty directory.
    fn remove_directory(&self, path: &str) -> DiskResult<()>;

    /// Remove `path` and everything below it.
    fn remove_recursive(&self, path: &str) -> DiskResult<()>;

    // ========================================================================
    // Files
    // ========================================================================

    /// Create an empty file.
    fn create_file(&self, path: &str) -> DiskResult<()>;

    /// Rename a file. Fails if `to` exists.
    fn move_file(&self, from: &str, to: &str) -> DiskResult<()>;

    /// Rename a file, overwriting `to` if it exists.
    fn replace_file(&self, from: &str, to: &str) -> DiskResult<()>;

    /// Remove a file.
    fn remove_file(&self, path: &str) -> DiskResult<()>;

    /// Remove a file if it exists.
    fn remove_file_if_exists(&self, path: &str) -> DiskResult<()>;

    /// Resize a file, zero-padding when it grows.
    fn truncate_file(&self, path: &str, size: u64) -> DiskResult<()>;

    /// Bind `dst` to the same contents as `src`.
    fn create_hard_link(&self, src: &str, dst: &str) -> DiskResult<()>;

    /// Mark `path` read-only.
    fn set_read_only(&self, path: &str) -> DiskResult<()>;

    /// Last modification time of `path`.
    fn get_last_modified(&self, path: &str) -> DiskResult<SystemTime>;

    /// Set the last modification time of `path`.
    fn set_last_modified(&self, path: &str, time: SystemTime) -> DiskResult<()>;

    // ========================================================================
    // Streams
    // ========================================================================

    /// Open a file for reading.
    fn read_file(&self, path: &str, settings: &ReadSettings) -> DiskResult<Box<dyn FileReader>>;

    /// Open a file for writing.
    fn write_file(&self, path: &str, settings: &WriteSettings)
    -> DiskResult<Box<dyn FileWriter>>;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Read entire file contents.
    fn read_all(&self, path: &str) -> DiskResult<Vec<u8>> {
        let mut reader = self.read_file(path, &ReadSettings::default())?;
        let mut buf = Vec::with_capacity(usize::try_from(reader.size()).unwrap_or(0));
        reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Replace entire file contents, creating the file if needed.
    fn write_all(&self, path: &str, data: &[u8]) -> DiskResult<()> {
        let mut writer = self.write_file(path, &WriteSettings::default())?;
        writer.write_all(data)?;
        writer.finalize()
    }
}
