//! Append-only line log.
//!
//! Contract: one writer at a time. Every append opens the file in append mode,
//! writes the record and its newline in a single `write_all`, and closes it, so
//! a record is either wholly present or torn only at the tail. Nothing spans
//! records: a batch of appends is not atomic as a group.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Durability {
    /// Leave flushing to the OS page cache.
    #[default]
    Buffered,
    /// `fdatasync` after every append.
    Fsync,
}

#[derive(Debug, Clone)]
pub struct Wal {
    path: PathBuf,
    durability: Durability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Byte offset of the first byte of the line.
    pub offset: u64,
    /// Line contents without the trailing newline.
    pub bytes: Vec<u8>,
}

impl Wal {
    pub fn new(path: impl Into<PathBuf>, durability: Durability) -> Self {
        Wal {
            path: path.into(),
            durability,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a line and return the offset it was written at.
    /// Records must not contain a newline. Parent directories are created.
    pub fn append(&self, record: &[u8]) -> io::Result<u64> {
        if record.contains(&b'\n') {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "wal record contains a newline"));
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let offset = file.metadata()?.len();

        let mut line = Vec::with_capacity(record.len() + 1);
        line.extend_from_slice(record);
        line.push(b'\n');
        file.write_all(&line)?;

        if self.durability == Durability::Fsync {
            file.sync_data()?;
        }

        Ok(offset)
    }

    /// Iterate over every line in write order. A missing log reads as empty.
    pub fn read_all(&self) -> io::Result<WalEntries> {
        let reader = match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };

        Ok(WalEntries { reader, offset: 0 })
    }

    /// Delete the log. Returns false when there was nothing to delete.
    pub fn remove(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

pub struct WalEntries {
    reader: Option<BufReader<File>>,
    offset: u64,
}

impl Iterator for WalEntries {
    type Item = io::Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        let mut bytes = Vec::new();

        match reader.read_until(b'\n', &mut bytes) {
            Ok(0) => None,
            Ok(read) => {
                let offset = self.offset;
                self.offset += read as u64;
                if bytes.last() == Some(&b'\n') {
                    bytes.pop();
                }
                Some(Ok(WalEntry { offset, bytes }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_offsets_and_reads_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path().join("nested/dir/log"), Durability::Fsync);

        assert_eq!(wal.append(b"first").unwrap(), 0);
        assert_eq!(wal.append(b"second").unwrap(), 6);

        let entries: Vec<WalEntry> = wal.read_all().unwrap().collect::<io::Result<_>>().unwrap();
        assert_eq!(
            entries,
            vec![
                WalEntry { offset: 0, bytes: b"first".to_vec() },
                WalEntry { offset: 6, bytes: b"second".to_vec() },
            ]
        );
    }

    #[test]
    fn newline_in_record_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path().join("log"), Durability::Buffered);
        assert!(wal.append(b"a\nb").is_err());
        assert!(!wal.path().exists());
    }

    #[test]
    fn missing_log_reads_empty_and_removes_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let wal = Wal::new(dir.path().join("log"), Durability::Buffered);
        assert_eq!(wal.read_all().unwrap().count(), 0);
        assert!(!wal.remove().unwrap());

        wal.append(b"x").unwrap();
        assert!(wal.remove().unwrap());
        assert!(!wal.remove().unwrap());
    }

    #[test]
    fn torn_tail_is_returned_as_a_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        fs::write(&path, b"whole\npart").unwrap();

        let wal = Wal::new(&path, Durability::Buffered);
        let lines: Vec<Vec<u8>> = wal.read_all().unwrap().map(|e| e.unwrap().bytes).collect();
        assert_eq!(lines, vec![b"whole".to_vec(), b"part".to_vec()]);
    }
}
