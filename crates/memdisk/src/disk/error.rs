//! Disk error types.

use std::io;
use thiserror::Error;

/// Disk error type.
///
/// Every variant is a deterministic, locally detected condition. Nothing here
/// is transient, so callers should not retry.
#[derive(Debug, Error)]
pub enum DiskError {
    /// File or directory not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Directory not empty.
    #[error("directory not empty: {0}")]
    DirectoryNotEmpty(String),

    /// Parent of the target path is missing or is not a directory.
    #[error("parent directory does not exist: {0}")]
    InvalidParent(String),

    /// Path cannot be normalized or names something the operation refuses.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// File is marked read-only and enforcement is enabled.
    #[error("read-only: {0}")]
    ReadOnly(String),

    /// Reservation exceeds the unreserved space of a bounded disk, or a
    /// file cannot grow to the requested size.
    #[error("not enough space: requested {requested} bytes, {available} available")]
    NoSpace { requested: u64, available: u64 },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl DiskError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create a DirectoryNotEmpty error.
    pub fn directory_not_empty(path: impl Into<String>) -> Self {
        Self::DirectoryNotEmpty(path.into())
    }

    /// Create an InvalidParent error.
    pub fn invalid_parent(path: impl Into<String>) -> Self {
        Self::InvalidParent(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a ReadOnly error.
    pub fn read_only(path: impl Into<String>) -> Self {
        Self::ReadOnly(path.into())
    }

    /// Create an Other error.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Returns true for the wrong-object-kind errors.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::NotADirectory(_) | Self::IsADirectory(_))
    }
}

/// Convert DiskError to std::io::Error so stream handles can surface it.
impl From<DiskError> for io::Error {
    fn from(e: DiskError) -> Self {
        match e {
            DiskError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            DiskError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            DiskError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            DiskError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            DiskError::DirectoryNotEmpty(msg) => {
                io::Error::new(io::ErrorKind::DirectoryNotEmpty, msg)
            }
            DiskError::InvalidParent(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            DiskError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            DiskError::ReadOnly(msg) => io::Error::new(io::ErrorKind::PermissionDenied, msg),
            e @ DiskError::NoSpace { .. } => {
                io::Error::new(io::ErrorKind::StorageFull, e.to_string())
            }
            DiskError::Io(e) => e,
            DiskError::Other(msg) => io::Error::other(msg),
        }
    }
}

/// Disk result type.
pub type DiskResult<T> = Result<T, DiskError>;
