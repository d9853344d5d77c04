//! Generic disk abstraction.
//!
//! Key components:
//!
//! - [`Disk`] - Core trait for disk operations
//! - [`FileReader`] / [`FileWriter`] - Stream handles returned by a disk
//! - [`DirectoryIterator`] - Restartable child listing
//! - [`path`] - Path keys and the prefix-matching routine
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: every operation names its target by path.
//! - **Staged writes**: writers commit on finalize, never piecemeal.

mod error;
mod iter;
mod ops;
pub mod path;
mod types;

pub use error::{DiskError, DiskResult};
pub use iter::DirectoryIterator;
pub use ops::{Disk, FileReader, FileWriter, Reservation};
pub use types::{
    DEFAULT_BUFFER_SIZE, DirEntry, DiskStats, DiskType, FileType, ReadSettings, WriteMode,
    WriteSettings,
};
