//! Read and write handles over memory disk files.
//!
//! Neither handle holds the table guard between calls. A reader touches
//! only its file node's lock; a writer takes the guard once, in
//! [`MemoryFileWriter::finalize`].

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use crate::disk::{DiskResult, FileReader, FileWriter, ReadSettings, WriteSettings};

use super::table::{FileNode, TableHandle};

/// Sequential reader over a live file node.
///
/// Reads see the node as it is at the time of each call, so truncates and
/// commits made through any alias after open are visible mid-read.
#[derive(Debug)]
pub struct MemoryFileReader {
    path: String,
    node: Arc<FileNode>,
    pos: u64,
    settings: ReadSettings,
}

impl MemoryFileReader {
    pub(crate) fn new(path: String, node: Arc<FileNode>, settings: ReadSettings) -> Self {
        Self {
            path,
            node,
            pos: 0,
            settings,
        }
    }

    /// Settings the reader was opened with.
    pub fn settings(&self) -> &ReadSettings {
        &self.settings
    }
}

impl Read for MemoryFileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.node.read_at(self.pos, buf);
        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for MemoryFileReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.node.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
        };
        match target {
            Some(offset) => {
                self.pos = offset;
                Ok(offset)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}

impl FileReader for MemoryFileReader {
    fn file_name(&self) -> &str {
        &self.path
    }

    fn position(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> u64 {
        self.node.len()
    }
}

/// Writer that stages bytes privately and commits them on finalize.
#[derive(Debug)]
pub struct MemoryFileWriter {
    path: String,
    table: TableHandle,
    staged: Vec<u8>,
    settings: WriteSettings,
    finalized: bool,
}

impl MemoryFileWriter {
    pub(crate) fn new(path: String, table: TableHandle, settings: WriteSettings) -> Self {
        Self {
            path,
            table,
            staged: Vec::new(),
            settings,
            finalized: false,
        }
    }

    /// Settings the writer was opened with.
    pub fn settings(&self) -> &WriteSettings {
        &self.settings
    }

    /// Bytes staged so far and not yet committed.
    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Commit the staged bytes into the path table.
    ///
    /// Takes the table guard for the duration of the commit only.
    pub fn finalize(&mut self) -> DiskResult<()> {
        if self.finalized {
            return Ok(());
        }
        let len = self.staged.len();
        self.table
            .lock()
            .commit_write(&self.path, &mut self.staged, self.settings.mode)?;
        self.finalized = true;
        tracing::debug!(path = %self.path, bytes = len, mode = %self.settings.mode, "write finalized");
        Ok(())
    }
}

impl Write for MemoryFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.finalized {
            return Err(io::Error::other(format!(
                "write to finalized file: {}",
                self.path
            )));
        }
        self.staged.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileWriter for MemoryFileWriter {
    fn file_name(&self) -> &str {
        &self.path
    }

    fn finalize(&mut self) -> DiskResult<()> {
        MemoryFileWriter::finalize(self)
    }

    fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn sync(&mut self) -> DiskResult<()> {
        Ok(())
    }
}

impl Drop for MemoryFileWriter {
    fn drop(&mut self) {
        if !self.finalized {
            tracing::debug!(
                path = %self.path,
                discarded = self.staged.len(),
                "writer dropped without finalize, nothing committed"
            );
        }
    }
}
