//! In-memory disk.
//!
//! Used by storage-engine tests that want real filesystem semantics without
//! touching real storage. All data is lost when the disk is dropped.
//!
//! One coarse `parking_lot::Mutex` guards the whole path table. Every
//! metadata operation is a short critical section under it; stream handles
//! hold only an `Arc` into the table and re-take the guard to commit.

mod space;
mod stream;
mod table;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use crate::config::{ConfigError, MemoryDiskConfig};
use crate::disk::path;
use crate::disk::{
    DirectoryIterator, Disk, DiskError, DiskResult, DiskStats, DiskType, FileReader, FileWriter,
    ReadSettings, Reservation, WriteSettings,
};

pub use space::{MemoryReservation, UNBOUNDED_SPACE};
pub use stream::{MemoryFileReader, MemoryFileWriter};

use space::SpaceAccounting;
use table::{Entry, PathTable, TableHandle};

static NEXT_DISK_ID: AtomicU64 = AtomicU64::new(1);

/// In-memory disk backed by a flat path table.
///
/// Thread-safe via an internal mutex. All data is lost when dropped.
pub struct MemoryDisk {
    id: u64,
    name: String,
    disk_path: String,
    table: TableHandle,
    space: Arc<SpaceAccounting>,
}

impl std::fmt::Debug for MemoryDisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDisk")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("table", &"<locked>")
            .finish()
    }
}

impl Default for MemoryDisk {
    fn default() -> Self {
        Self::build(MemoryDiskConfig::default())
    }
}

impl MemoryDisk {
    /// Create an unbounded disk with the given name.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        Self::from_config(MemoryDiskConfig::new(name))
    }

    /// Create a disk from a config. The config is validated first.
    pub fn from_config(config: MemoryDiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: MemoryDiskConfig) -> Self {
        let id = NEXT_DISK_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id, name = %config.name, capacity = ?config.capacity, "memory disk created");
        Self {
            id,
            disk_path: format!("memory://{}/", config.name),
            name: config.name,
            table: Arc::new(Mutex::new(PathTable::new(config.enforce_read_only))),
            space: SpaceAccounting::new(config.capacity, config.keep_free_bytes),
        }
    }

    /// Number of path keys that share the file's contents.
    pub fn link_count(&self, path: &str) -> DiskResult<usize> {
        let key = path::normalize(path)?;
        Ok(self.table.lock().file(&key)?.links())
    }

    /// Read the advisory read-only flag.
    pub fn is_read_only(&self, path: &str) -> DiskResult<bool> {
        let key = path::normalize(path)?;
        self.table.lock().is_read_only(&key)
    }

    /// Open a reader with the concrete handle type.
    pub fn open_reader(&self, path: &str, settings: &ReadSettings) -> DiskResult<MemoryFileReader> {
        let key = path::normalize(path)?;
        let node = Arc::clone(self.table.lock().file(&key)?);
        Ok(MemoryFileReader::new(key, node, *settings))
    }

    /// Open a writer with the concrete handle type.
    pub fn open_writer(&self, path: &str, settings: &WriteSettings) -> DiskResult<MemoryFileWriter> {
        let key = path::normalize(path)?;
        self.table.lock().check_writable(&key)?;
        Ok(MemoryFileWriter::new(key, Arc::clone(&self.table), *settings))
    }

    /// Reserve with the concrete handle type.
    pub fn reserve_space(&self, bytes: u64) -> DiskResult<MemoryReservation> {
        let table = Arc::clone(&self.table);
        MemoryReservation::acquire(
            Arc::clone(&self.space),
            Arc::new(move || table.lock().used_bytes()),
            bytes,
        )
    }

    fn used_bytes(&self) -> u64 {
        self.table.lock().used_bytes()
    }

    /// Normalize a path for the query methods, which never fail.
    fn lookup<T>(&self, path: &str, f: impl FnOnce(Option<&Entry>) -> T) -> T {
        match path::normalize(path) {
            Ok(key) => f(self.table.lock().get(&key)),
            Err(_) => f(None),
        }
    }
}

impl Disk for MemoryDisk {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &str {
        &self.disk_path
    }

    fn disk_type(&self) -> DiskType {
        DiskType::Memory
    }

    fn reserve(&self, bytes: u64) -> DiskResult<Box<dyn Reservation>> {
        Ok(Box::new(self.reserve_space(bytes)?))
    }

    fn get_total_space(&self) -> u64 {
        self.space.total()
    }

    fn get_available_space(&self) -> u64 {
        self.space.available(self.used_bytes())
    }

    fn get_unreserved_space(&self) -> u64 {
        self.space.unreserved(self.used_bytes())
    }

    fn stats(&self) -> DiskStats {
        let (used_bytes, entries) = {
            let table = self.table.lock();
            (table.used_bytes(), table.len() as u64)
        };
        DiskStats {
            total_bytes: self.space.total(),
            used_bytes,
            reserved_bytes: self.space.reserved(),
            entries,
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.lookup(path, |entry| entry.is_some())
    }

    fn is_file(&self, path: &str) -> bool {
        self.lookup(path, |entry| matches!(entry, Some(Entry::File(_))))
    }

    fn is_directory(&self, path: &str) -> bool {
        self.lookup(path, |entry| matches!(entry, Some(Entry::Directory { .. })))
    }

    fn get_file_size(&self, path: &str) -> DiskResult<u64> {
        let key = path::normalize(path)?;
        Ok(self.table.lock().file(&key)?.len())
    }

    fn list_files(&self, path: &str) -> DiskResult<Vec<String>> {
        Ok(self.iterate_directory(path)?.map(|entry| entry.name).collect())
    }

    fn iterate_directory(&self, path: &str) -> DiskResult<DirectoryIterator> {
        let key = path::normalize(path)?;
        let children = {
            let table = self.table.lock();
            table.require_dir(&key)?;
            table.children(&key)
        };
        Ok(DirectoryIterator::new(key, children))
    }

    fn create_directory(&self, path: &str) -> DiskResult<()> {
        let key = path::normalize(path)?;
        self.table.lock().insert_directory(&key)?;
        tracing::debug!(path = %key, "directory created");
        Ok(())
    }

    fn create_directories(&self, path: &str) -> DiskResult<()> {
        let key = path::normalize(path)?;
        let created = self.table.lock().insert_directories(&key)?;
        if created > 0 {
            tracing::debug!(path = %key, created, "directories created");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "memdisk.clear_directory")]
    fn clear_directory(&self, path: &str) -> DiskResult<()> {
        let key = path::normalize(path)?;
        let removed = self.table.lock().clear_children(&key)?;
        tracing::debug!(path = %key, removed, "directory cleared");
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "memdisk.move_directory")]
    fn move_directory(&self, from: &str, to: &str) -> DiskResult<()> {
        let from = path::normalize(from)?;
        let to = path::normalize(to)?;
        let moved = self.table.lock().rename_tree(&from, &to)?;
        tracing::debug!(%from, %to, moved, "directory moved");
        Ok(())
    }

    fn remove_directory(&self, path: &str) -> DiskResult<()> {
        let key = path::normalize(path)?;
        if path::is_root(&key) {
            return Err(DiskError::invalid_path("cannot remove root"));
        }
        let mut table = self.table.lock();
        table.require_dir(&key)?;
        if table.has_descendants(&key) {
            return Err(DiskError::directory_not_empty(key));
        }
        table.remove(&key);
        drop(table);
        tracing::debug!(path = %key, "directory removed");
        Ok(())
    }

    #[tracing::instrument(skip(self), name = "memdisk.remove_recursive")]
    fn remove_recursive(&self, path: &str) -> DiskResult<()> {
        let key = path::normalize(path)?;
        let removed = self.table.lock().remove_tree(&key)?;
        tracing::debug!(path = %key, removed, "tree removed");
        Ok(())
    }

    fn create_file(&self, path: &str) -> DiskResult<()> {
        let key = path::normalize(path)?;
        self.table.lock().insert_file(&key)?;
        tracing::debug!(path = %key, "file created");
        Ok(())
    }

    fn move_file(&self, from: &str, to: &str) -> DiskResult<()> {
        let from = path::normalize(from)?;
        let to = path::normalize(to)?;
        self.table.lock().rename_file(&from, &to, false)?;
        tracing::debug!(%from, %to, "file moved");
        Ok(())
    }

    fn replace_file(&self, from: &str, to: &str) -> DiskResult<()> {
        let from = path::normalize(from)?;
        let to = path::normalize(to)?;
        self.table.lock().rename_file(&from, &to, true)?;
        tracing::debug!(%from, %to, "file replaced");
        Ok(())
    }

    fn remove_file(&self, path: &str) -> DiskResult<()> {
        let key = path::normalize(path)?;
        let mut table = self.table.lock();
        table.file(&key)?;
        table.remove(&key);
        drop(table);
        tracing::debug!(path = %key, "file removed");
        Ok(())
    }

    fn remove_file_if_exists(&self, path: &str) -> DiskResult<()> {
        match self.remove_file(path) {
            Err(DiskError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    fn truncate_file(&self, path: &str, size: u64) -> DiskResult<()> {
        let key = path::normalize(path)?;
        self.table.lock().truncate(&key, size)?;
        tracing::debug!(path = %key, size, "file truncated");
        Ok(())
    }

    fn create_hard_link(&self, src: &str, dst: &str) -> DiskResult<()> {
        let src = path::normalize(src)?;
        let dst = path::normalize(dst)?;
        self.table.lock().link(&src, &dst)?;
        tracing::debug!(%src, %dst, "hard link created");
        Ok(())
    }

    fn set_read_only(&self, path: &str) -> DiskResult<()> {
        let key = path::normalize(path)?;
        self.table.lock().mark_read_only(&key)
    }

    fn get_last_modified(&self, path: &str) -> DiskResult<SystemTime> {
        let key = path::normalize(path)?;
        if !self.table.lock().contains(&key) {
            return Err(DiskError::not_found(key));
        }
        Ok(UNIX_EPOCH)
    }

    fn set_last_modified(&self, path: &str, _time: SystemTime) -> DiskResult<()> {
        let key = path::normalize(path)?;
        if !self.table.lock().contains(&key) {
            return Err(DiskError::not_found(key));
        }
        Ok(())
    }

    fn read_file(&self, path: &str, settings: &ReadSettings) -> DiskResult<Box<dyn FileReader>> {
        Ok(Box::new(self.open_reader(path, settings)?))
    }

    fn write_file(
        &self,
        path: &str,
        settings: &WriteSettings,
    ) -> DiskResult<Box<dyn FileWriter>> {
        Ok(Box::new(self.open_writer(path, settings)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom, Write};

    fn disk() -> MemoryDisk {
        MemoryDisk::new("test").unwrap()
    }

    #[test]
    fn test_identity() {
        let a = disk();
        let b = MemoryDisk::new("other").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.name(), "test");
        assert_eq!(a.path(), "memory://test/");
        assert_eq!(a.disk_type(), DiskType::Memory);
    }

    #[test]
    fn test_create_and_read() {
        let fs = disk();
        fs.write_all("test.txt", b"hello world").unwrap();
        assert_eq!(fs.read_all("test.txt").unwrap(), b"hello world");
        assert_eq!(fs.get_file_size("/test.txt").unwrap(), 11);
    }

    #[test]
    fn test_partial_read_and_seek() {
        let fs = disk();
        fs.write_all("test.txt", b"hello world").unwrap();

        let mut reader = fs.open_reader("test.txt", &ReadSettings::default()).unwrap();
        reader.seek(SeekFrom::Start(6)).unwrap();
        let mut buf = [0u8; 5];
        reader.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"world");
        assert_eq!(reader.position(), 11);
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
        assert!(reader.seek(SeekFrom::Current(-20)).is_err());
    }

    #[test]
    fn test_root_is_a_directory() {
        let fs = disk();
        assert!(fs.is_directory("/"));
        assert!(fs.is_directory(""));
        assert!(matches!(fs.remove_directory("/"), Err(DiskError::InvalidPath(_))));
        assert!(matches!(fs.remove_recursive("/"), Err(DiskError::InvalidPath(_))));
    }

    #[test]
    fn test_queries_on_absent_and_invalid_paths() {
        let fs = disk();
        assert!(!fs.exists("nope"));
        assert!(!fs.is_file("nope"));
        assert!(!fs.is_directory("nope"));
        assert!(!fs.exists("/../escape"));
        assert!(matches!(fs.get_file_size("nope"), Err(DiskError::NotFound(_))));
    }

    #[test]
    fn test_file_ops_on_directories() {
        let fs = disk();
        fs.create_directory("d").unwrap();
        assert!(matches!(fs.get_file_size("d"), Err(DiskError::IsADirectory(_))));
        assert!(matches!(fs.truncate_file("d", 0), Err(DiskError::IsADirectory(_))));
        assert!(matches!(fs.remove_file("d"), Err(DiskError::IsADirectory(_))));
        assert!(matches!(
            fs.read_file("d", &ReadSettings::default()),
            Err(DiskError::IsADirectory(_))
        ));
        assert!(matches!(
            fs.write_file("d", &WriteSettings::default()),
            Err(DiskError::IsADirectory(_))
        ));
        assert!(matches!(fs.create_hard_link("d", "e"), Err(DiskError::IsADirectory(_))));
        assert!(matches!(fs.move_file("d", "e"), Err(DiskError::IsADirectory(_))));
    }

    #[test]
    fn test_directory_ops_on_files() {
        let fs = disk();
        fs.create_file("f").unwrap();
        assert!(matches!(fs.list_files("f"), Err(DiskError::NotADirectory(_))));
        assert!(matches!(fs.remove_directory("f"), Err(DiskError::NotADirectory(_))));
        assert!(matches!(fs.clear_directory("f"), Err(DiskError::NotADirectory(_))));
        assert!(matches!(fs.move_directory("f", "g"), Err(DiskError::NotADirectory(_))));
        assert!(matches!(fs.create_directories("f/g"), Err(DiskError::NotADirectory(_))));
    }

    #[test]
    fn test_writer_requires_parent() {
        let fs = disk();
        assert!(matches!(
            fs.write_file("missing/f", &WriteSettings::default()),
            Err(DiskError::InvalidParent(_))
        ));
    }

    #[test]
    fn test_writer_finalize_is_idempotent() {
        let fs = disk();
        let mut writer = fs.open_writer("f", &WriteSettings::default()).unwrap();
        writer.write_all(b"abc").unwrap();
        assert_eq!(writer.staged_len(), 3);
        assert!(!fs.exists("f"));

        writer.finalize().unwrap();
        writer.finalize().unwrap();
        assert!(writer.is_finalized());
        assert!(writer.write(b"more").is_err());
        assert_eq!(fs.read_all("f").unwrap(), b"abc");
    }

    #[test]
    fn test_finalize_fails_if_target_became_directory() {
        let fs = disk();
        let mut writer = fs.open_writer("x", &WriteSettings::default()).unwrap();
        writer.write_all(b"data").unwrap();
        fs.create_directory("x").unwrap();

        assert!(matches!(writer.finalize(), Err(DiskError::IsADirectory(_))));
        assert!(!writer.is_finalized());
        assert_eq!(writer.staged_len(), 4);
    }

    #[test]
    fn test_append_mode() {
        let fs = disk();
        fs.write_all("log", b"one,").unwrap();

        let mut writer = fs.write_file("log", &WriteSettings::append()).unwrap();
        writer.write_all(b"two").unwrap();
        writer.finalize().unwrap();
        assert_eq!(fs.read_all("log").unwrap(), b"one,two");
    }

    #[test]
    fn test_last_modified_stub() {
        let fs = disk();
        fs.create_file("f").unwrap();
        fs.set_last_modified("f", SystemTime::now()).unwrap();
        assert_eq!(fs.get_last_modified("f").unwrap(), UNIX_EPOCH);
        assert!(matches!(fs.get_last_modified("nope"), Err(DiskError::NotFound(_))));
    }

    #[test]
    fn test_read_only_is_advisory_by_default() {
        let fs = disk();
        fs.write_all("f", b"abc").unwrap();
        fs.set_read_only("f").unwrap();
        assert!(fs.is_read_only("f").unwrap());

        fs.truncate_file("f", 1).unwrap();
        fs.write_all("f", b"xyz").unwrap();
        assert_eq!(fs.read_all("f").unwrap(), b"xyz");
        assert!(matches!(fs.set_read_only("nope"), Err(DiskError::NotFound(_))));
    }

    #[test]
    fn test_read_only_enforced_when_configured() {
        let fs = MemoryDisk::from_config(MemoryDiskConfig::new("ro").with_enforce_read_only(true))
            .unwrap();
        fs.write_all("f", b"abc").unwrap();
        fs.create_hard_link("f", "alias").unwrap();
        fs.set_read_only("f").unwrap();

        // the flag lives on the shared node
        assert!(fs.is_read_only("alias").unwrap());
        assert!(matches!(fs.truncate_file("alias", 0), Err(DiskError::ReadOnly(_))));
        assert!(matches!(
            fs.write_file("f", &WriteSettings::default()),
            Err(DiskError::ReadOnly(_))
        ));
        assert_eq!(fs.read_all("f").unwrap(), b"abc");
    }

    #[test]
    fn test_stats() {
        let fs = disk();
        fs.create_directory("d").unwrap();
        fs.write_all("d/a", &[1; 100]).unwrap();
        fs.create_hard_link("d/a", "d/b").unwrap();

        let stats = fs.stats();
        assert_eq!(stats.total_bytes, UNBOUNDED_SPACE);
        assert_eq!(stats.used_bytes, 100);
        assert_eq!(stats.entries, 4);
        assert_eq!(stats.reserved_bytes, 0);
    }
}
