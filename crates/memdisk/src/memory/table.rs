//! The path table: one flat map from path key to object.
//!
//! There is no parent-to-children index. Tree questions are answered by
//! scanning keys with the helpers in [`crate::disk::path`]. All methods
//! expect already-normalized keys and are called with the disk's guard held.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::disk::path::{self, ROOT};
use crate::disk::{DirEntry, DiskError, DiskResult, FileType, WriteMode};

/// Shared file contents.
///
/// Every path key that is a hard link to the same file holds a clone of
/// the same `Arc<FileNode>`. Mutation goes through the inner lock and is
/// visible through all of them.
#[derive(Debug)]
pub(crate) struct FileNode {
    data: RwLock<Vec<u8>>,
    links: AtomicUsize,
    read_only: AtomicBool,
}

impl FileNode {
    fn new(data: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            data: RwLock::new(data),
            links: AtomicUsize::new(1),
            read_only: AtomicBool::new(false),
        })
    }

    pub(crate) fn len(&self) -> u64 {
        self.data.read().len() as u64
    }

    pub(crate) fn links(&self) -> usize {
        self.links.load(Ordering::Acquire)
    }

    pub(crate) fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Acquire)
    }

    /// Copy bytes starting at `offset` into `buf`. Returns bytes copied.
    pub(crate) fn read_at(&self, offset: u64, buf: &mut [u8]) -> usize {
        let data = self.data.read();
        let start = usize::try_from(offset).map_or(data.len(), |o| o.min(data.len()));
        let end = (start + buf.len()).min(data.len());
        buf[..end - start].copy_from_slice(&data[start..end]);
        end - start
    }

    /// Resize to `size` bytes, zero-padding on growth. Growth that cannot
    /// be allocated fails and leaves the contents untouched.
    fn resize(&self, size: u64) -> DiskResult<()> {
        let mut data = self.data.write();
        let grow = size.saturating_sub(data.len() as u64);
        let refused = || DiskError::NoSpace {
            requested: grow,
            available: 0,
        };
        let size = usize::try_from(size).map_err(|_| refused())?;
        if let Some(extra) = size.checked_sub(data.len()) {
            data.try_reserve(extra).map_err(|_| refused())?;
        }
        data.resize(size, 0);
        Ok(())
    }

    fn commit(&self, bytes: Vec<u8>, mode: WriteMode) {
        let mut data = self.data.write();
        match mode {
            WriteMode::Rewrite => *data = bytes,
            WriteMode::Append => data.extend_from_slice(&bytes),
        }
    }
}

/// Object stored under one path key.
#[derive(Debug, Clone)]
pub(crate) enum Entry {
    File(Arc<FileNode>),
    Directory { read_only: bool },
}

impl Entry {
    fn directory() -> Self {
        Entry::Directory { read_only: false }
    }

    pub(crate) fn kind(&self) -> FileType {
        match self {
            Entry::File(_) => FileType::File,
            Entry::Directory { .. } => FileType::Directory,
        }
    }
}

/// Capability handle a write stream uses to commit into the table.
pub(crate) type TableHandle = Arc<Mutex<PathTable>>;

/// Flat map from normalized path key to object.
#[derive(Debug)]
pub(crate) struct PathTable {
    entries: HashMap<String, Entry>,
    enforce_read_only: bool,
}

impl PathTable {
    /// Create a table holding only the root directory.
    pub(crate) fn new(enforce_read_only: bool) -> Self {
        let mut entries = HashMap::new();
        entries.insert(ROOT.to_string(), Entry::directory());
        Self {
            entries,
            enforce_read_only,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub(crate) fn is_dir(&self, key: &str) -> bool {
        matches!(self.entries.get(key), Some(Entry::Directory { .. }))
    }

    /// Look up a file node. `NotFound` if absent, `IsADirectory` if not a file.
    pub(crate) fn file(&self, key: &str) -> DiskResult<&Arc<FileNode>> {
        match self.entries.get(key) {
            Some(Entry::File(node)) => Ok(node),
            Some(Entry::Directory { .. }) => Err(DiskError::is_a_directory(key)),
            None => Err(DiskError::not_found(key)),
        }
    }

    /// Check that `key` is an existing directory.
    pub(crate) fn require_dir(&self, key: &str) -> DiskResult<()> {
        match self.entries.get(key) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File(_)) => Err(DiskError::not_a_directory(key)),
            None => Err(DiskError::not_found(key)),
        }
    }

    /// Check that the parent of `key` is an existing directory.
    pub(crate) fn require_parent(&self, key: &str) -> DiskResult<()> {
        match path::parent(key) {
            Some(parent) if self.is_dir(parent) => Ok(()),
            Some(_) => Err(DiskError::invalid_parent(key)),
            None => Err(DiskError::already_exists(key)),
        }
    }

    fn require_writable(&self, key: &str, node: &FileNode) -> DiskResult<()> {
        if self.enforce_read_only && node.is_read_only() {
            return Err(DiskError::read_only(key));
        }
        Ok(())
    }

    /// Immediate children of `dir`, unsorted.
    pub(crate) fn children(&self, dir: &str) -> Vec<DirEntry> {
        self.entries
            .iter()
            .filter_map(|(key, entry)| {
                path::child_name(key, dir).map(|name| DirEntry::new(name, key, entry.kind()))
            })
            .collect()
    }

    /// Keys strictly below `dir`.
    pub(crate) fn descendants(&self, dir: &str) -> Vec<String> {
        self.entries
            .keys()
            .filter(|key| path::is_descendant_of(key, dir))
            .cloned()
            .collect()
    }

    /// Returns true if any key lies below `dir`.
    pub(crate) fn has_descendants(&self, dir: &str) -> bool {
        self.entries
            .keys()
            .any(|key| path::is_descendant_of(key, dir))
    }

    /// Sum of distinct file node lengths. Hard links count once.
    pub(crate) fn used_bytes(&self) -> u64 {
        let mut seen = std::collections::HashSet::new();
        self.entries
            .values()
            .filter_map(|entry| match entry {
                Entry::File(node) if seen.insert(Arc::as_ptr(node)) => Some(node.len()),
                _ => None,
            })
            .sum()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Insert an empty directory. The parent must already exist.
    pub(crate) fn insert_directory(&mut self, key: &str) -> DiskResult<()> {
        if self.contains(key) {
            return Err(DiskError::already_exists(key));
        }
        self.require_parent(key)?;
        self.entries.insert(key.to_string(), Entry::directory());
        Ok(())
    }

    /// Create `key` and every missing ancestor as directories.
    ///
    /// All segments are checked before anything is inserted. Returns the
    /// number of directories created.
    pub(crate) fn insert_directories(&mut self, key: &str) -> DiskResult<usize> {
        let segments: Vec<&str> = path::ancestors(key)
            .chain((!path::is_root(key)).then_some(key))
            .collect();

        if let Some(file) = segments
            .iter()
            .find(|segment| matches!(self.entries.get(**segment), Some(Entry::File(_))))
        {
            return Err(DiskError::not_a_directory(*file));
        }

        let mut created = 0;
        for segment in segments {
            if !self.contains(segment) {
                self.entries.insert(segment.to_string(), Entry::directory());
                created += 1;
            }
        }
        Ok(created)
    }

    /// Insert an empty file. The parent must already exist.
    pub(crate) fn insert_file(&mut self, key: &str) -> DiskResult<()> {
        if self.contains(key) {
            return Err(DiskError::already_exists(key));
        }
        self.require_parent(key)?;
        self.entries
            .insert(key.to_string(), Entry::File(FileNode::new(Vec::new())));
        Ok(())
    }

    /// Remove one key, dropping its link to any shared file node.
    pub(crate) fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        if let Entry::File(node) = &entry {
            node.links.fetch_sub(1, Ordering::AcqRel);
        }
        Some(entry)
    }

    /// Remove the immediate children of `dir`.
    ///
    /// Fails with `DirectoryNotEmpty` before removing anything if any child
    /// is a directory that still has children of its own.
    pub(crate) fn clear_children(&mut self, dir: &str) -> DiskResult<usize> {
        self.require_dir(dir)?;
        let children = self.children(dir);

        if let Some(busy) = children
            .iter()
            .find(|child| child.kind.is_dir() && self.has_descendants(&child.path))
        {
            return Err(DiskError::directory_not_empty(busy.path.clone()));
        }

        for child in &children {
            self.remove(&child.path);
        }
        Ok(children.len())
    }

    /// Remove `key` and every key below it. Returns keys removed.
    pub(crate) fn remove_tree(&mut self, key: &str) -> DiskResult<usize> {
        if path::is_root(key) {
            return Err(DiskError::invalid_path("cannot remove root"));
        }
        if !self.contains(key) {
            return Err(DiskError::not_found(key));
        }

        let mut doomed = self.descendants(key);
        doomed.push(key.to_string());
        for victim in &doomed {
            self.remove(victim);
        }
        Ok(doomed.len())
    }

    /// Rename a directory and every key below it.
    ///
    /// Every precondition is checked before the first key moves. Returns
    /// the number of keys renamed.
    pub(crate) fn rename_tree(&mut self, from: &str, to: &str) -> DiskResult<usize> {
        if path::is_root(from) {
            return Err(DiskError::invalid_path("cannot move root"));
        }
        self.require_dir(from)?;
        if to == from || path::is_descendant_of(to, from) {
            return Err(DiskError::invalid_path(format!(
                "cannot move {from} into itself ({to})"
            )));
        }
        if self.contains(to) {
            return Err(DiskError::already_exists(to));
        }
        self.require_parent(to)?;

        let mut moving = self.descendants(from);
        moving.push(from.to_string());

        let mut renamed = Vec::with_capacity(moving.len());
        for old in &moving {
            if let (Some(new), Some(entry)) =
                (path::rebase(old, from, to), self.entries.remove(old))
            {
                renamed.push((new, entry));
            }
        }
        let count = renamed.len();
        self.entries.extend(renamed);
        Ok(count)
    }

    /// Rename one file key, keeping its node (and hence its aliases).
    ///
    /// With `overwrite`, an existing file at `to` is replaced and loses one
    /// link; otherwise an existing `to` is an error.
    pub(crate) fn rename_file(&mut self, from: &str, to: &str, overwrite: bool) -> DiskResult<()> {
        self.file(from)?;
        match self.entries.get(to) {
            Some(Entry::Directory { .. }) if overwrite => {
                return Err(DiskError::is_a_directory(to));
            }
            Some(_) if !overwrite && from != to => return Err(DiskError::already_exists(to)),
            None => self.require_parent(to)?,
            Some(_) => {}
        }
        if from == to {
            return Ok(());
        }

        if let Some(entry) = self.entries.remove(from) {
            if overwrite {
                self.remove(to);
            }
            self.entries.insert(to.to_string(), entry);
        }
        Ok(())
    }

    /// Bind `dst` to the node of `src`.
    pub(crate) fn link(&mut self, src: &str, dst: &str) -> DiskResult<()> {
        let node = Arc::clone(self.file(src)?);
        if self.contains(dst) {
            return Err(DiskError::already_exists(dst));
        }
        self.require_parent(dst)?;

        node.links.fetch_add(1, Ordering::AcqRel);
        self.entries.insert(dst.to_string(), Entry::File(node));
        Ok(())
    }

    /// Resize a file in place.
    pub(crate) fn truncate(&self, key: &str, size: u64) -> DiskResult<()> {
        let node = self.file(key)?;
        self.require_writable(key, node)?;
        node.resize(size)
    }

    /// Set the advisory read-only flag.
    pub(crate) fn mark_read_only(&mut self, key: &str) -> DiskResult<()> {
        match self.entries.get_mut(key) {
            Some(Entry::File(node)) => node.read_only.store(true, Ordering::Release),
            Some(Entry::Directory { read_only }) => *read_only = true,
            None => return Err(DiskError::not_found(key)),
        }
        Ok(())
    }

    /// Read the advisory read-only flag.
    pub(crate) fn is_read_only(&self, key: &str) -> DiskResult<bool> {
        match self.entries.get(key) {
            Some(Entry::File(node)) => Ok(node.is_read_only()),
            Some(Entry::Directory { read_only }) => Ok(*read_only),
            None => Err(DiskError::not_found(key)),
        }
    }

    /// Check whether a writer may be opened on `key`.
    pub(crate) fn check_writable(&self, key: &str) -> DiskResult<()> {
        match self.entries.get(key) {
            Some(Entry::File(node)) => self.require_writable(key, node),
            Some(Entry::Directory { .. }) => Err(DiskError::is_a_directory(key)),
            None => self.require_parent(key),
        }
    }

    /// Commit staged bytes written to `key`.
    ///
    /// An existing file is updated through its shared node so every alias
    /// sees the result. A missing file is created, provided its parent is
    /// still a directory. `staged` is drained only on success.
    pub(crate) fn commit_write(
        &mut self,
        key: &str,
        staged: &mut Vec<u8>,
        mode: WriteMode,
    ) -> DiskResult<()> {
        match self.entries.get(key) {
            Some(Entry::File(node)) => {
                self.require_writable(key, node)?;
                node.commit(std::mem::take(staged), mode);
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(DiskError::is_a_directory(key)),
            None => {
                self.require_parent(key)?;
                let node = FileNode::new(std::mem::take(staged));
                self.entries.insert(key.to_string(), Entry::File(node));
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(dirs: &[&str], files: &[&str]) -> PathTable {
        let mut table = PathTable::new(false);
        for dir in dirs {
            table.insert_directories(dir).unwrap();
        }
        for file in files {
            table.insert_file(file).unwrap();
        }
        table
    }

    #[test]
    fn test_root_always_present() {
        let table = PathTable::new(false);
        assert!(table.is_dir(ROOT));
        assert_eq!(table.len(), 1);
        assert!(table.children(ROOT).is_empty());
    }

    #[test]
    fn test_children_and_descendants() {
        let table = table_with(&["d/y", "dd"], &["d/x", "d/y/z"]);

        let mut names: Vec<_> = table.children("d").into_iter().map(|e| e.name).collect();
        names.sort();
        assert_eq!(names, vec!["x", "y"]);

        let mut below = table.descendants("d");
        below.sort();
        assert_eq!(below, vec!["d/x", "d/y", "d/y/z"]);
        assert!(!table.has_descendants("dd"));
    }

    #[test]
    fn test_insert_requires_parent() {
        let mut table = PathTable::new(false);
        assert!(matches!(
            table.insert_file("missing/f"),
            Err(DiskError::InvalidParent(_))
        ));
        table.insert_file("f").unwrap();
        assert!(matches!(
            table.insert_directory("f/g"),
            Err(DiskError::InvalidParent(_))
        ));
    }

    #[test]
    fn test_insert_directories_checks_before_mutating() {
        let mut table = table_with(&["a"], &["a/file"]);
        let before = table.len();
        assert!(matches!(
            table.insert_directories("a/file/b/c"),
            Err(DiskError::NotADirectory(_))
        ));
        assert_eq!(table.len(), before);
        assert_eq!(table.insert_directories("a/b/c").unwrap(), 2);
        assert_eq!(table.insert_directories("a/b/c").unwrap(), 0);
    }

    #[test]
    fn test_link_counts() {
        let mut table = table_with(&[], &["a"]);
        table.link("a", "b").unwrap();
        let node = Arc::clone(table.file("b").unwrap());
        assert_eq!(node.links(), 2);

        table.remove("a");
        assert_eq!(node.links(), 1);
        assert!(table.file("b").is_ok());
    }

    #[test]
    fn test_rename_tree_rejects_self_nesting() {
        let mut table = table_with(&["d"], &[]);
        assert!(matches!(
            table.rename_tree("d", "d/inner"),
            Err(DiskError::InvalidPath(_))
        ));
        assert!(matches!(
            table.rename_tree("d", "d"),
            Err(DiskError::InvalidPath(_))
        ));
        assert!(table.is_dir("d"));
    }

    #[test]
    fn test_truncate_beyond_address_space_fails() {
        let mut table = table_with(&[], &["f"]);
        table.commit_write("f", &mut b"keep".to_vec(), WriteMode::Rewrite).unwrap();

        assert!(matches!(
            table.truncate("f", u64::MAX),
            Err(DiskError::NoSpace { .. })
        ));
        assert_eq!(table.file("f").unwrap().len(), 4);

        table.truncate("f", 6).unwrap();
        assert_eq!(table.file("f").unwrap().len(), 6);
    }

    #[test]
    fn test_commit_append_and_rewrite() {
        let mut table = table_with(&[], &["f"]);
        table.commit_write("f", &mut b"abc".to_vec(), WriteMode::Rewrite).unwrap();
        table.commit_write("f", &mut b"def".to_vec(), WriteMode::Append).unwrap();

        let mut buf = [0u8; 8];
        let n = table.file("f").unwrap().read_at(0, &mut buf);
        assert_eq!(&buf[..n], b"abcdef");

        table.commit_write("f", &mut b"x".to_vec(), WriteMode::Rewrite).unwrap();
        assert_eq!(table.file("f").unwrap().len(), 1);
    }

    #[test]
    fn test_used_bytes_counts_links_once() {
        let mut table = table_with(&[], &["a"]);
        table.commit_write("a", &mut vec![7; 10], WriteMode::Rewrite).unwrap();
        table.link("a", "b").unwrap();
        table.commit_write("c", &mut vec![1; 5], WriteMode::Rewrite).unwrap();
        assert_eq!(table.used_bytes(), 15);
    }
}
