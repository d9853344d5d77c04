//! Directory iteration.

use super::types::DirEntry;

/// Restartable iterator over the immediate children of a directory.
///
/// The listing is captured when the iterator is created; later changes to
/// the directory are not reflected. Entries come out sorted by name.
#[derive(Debug, Clone)]
pub struct DirectoryIterator {
    dir: String,
    entries: Vec<DirEntry>,
    pos: usize,
}

impl DirectoryIterator {
    /// Create an iterator over `entries` of directory `dir`.
    pub fn new(dir: impl Into<String>, mut entries: Vec<DirEntry>) -> Self {
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            dir: dir.into(),
            entries,
            pos: 0,
        }
    }

    /// Normalized path of the directory being iterated.
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// Entry at the cursor, if any.
    pub fn current(&self) -> Option<&DirEntry> {
        self.entries.get(self.pos)
    }

    /// Returns true while the cursor points at an entry.
    pub fn is_valid(&self) -> bool {
        self.pos < self.entries.len()
    }

    /// Restart from the first entry.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Number of entries, regardless of cursor position.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

impl Iterator for DirectoryIterator {
    type Item = DirEntry;

    fn next(&mut self) -> Option<DirEntry> {
        let entry = self.entries.get(self.pos)?.clone();
        self.pos += 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DirectoryIterator {}
