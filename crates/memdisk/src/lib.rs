//! # memdisk
//!
//! In-memory disk with real hierarchical filesystem semantics.
//!
//! Storage-engine tests run against a [`MemoryDisk`] instead of local
//! storage. The disk:
//! - Keeps every file and directory in one flat table keyed by path
//! - Enforces parent/child rules on creation, move and removal
//! - Stages writes in a private buffer and commits them on finalize
//! - Shares file contents between hard links
//! - Tracks advisory space reservations

pub mod config;
pub mod disk;
pub mod memory;

pub use config::{ConfigError, MemoryDiskConfig};
pub use disk::{
    DirEntry, DirectoryIterator, Disk, DiskError, DiskResult, DiskStats, DiskType, FileReader,
    FileType, FileWriter, ReadSettings, Reservation, WriteMode, WriteSettings,
};
pub use memory::{MemoryDisk, MemoryFileReader, MemoryFileWriter, MemoryReservation};
