//! Filesystem collaborator for the script interpreter.
//!
//! The interpreter only talks to this trait, so script semantics can be
//! tested against an in-memory implementation with controlled timestamps.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Filesystem operation failures.
#[derive(Debug, Error, PartialEq)]
pub enum FsError {
    #[error("path does not exist: {0}")]
    NotFound(PathBuf),
    #[error("io error: {0}")]
    Io(String),
}

/// The file operations a script can perform.
pub trait FileSystem {
    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Copy `src` to `dest`, replacing `dest` if present.
    fn copy_overwrite(&mut self, src: &Path, dest: &Path) -> Result<(), FsError>;

    /// Move `src` to `dest`, replacing `dest` if present.
    fn move_overwrite(&mut self, src: &Path, dest: &Path) -> Result<(), FsError>;

    /// Delete the file or directory at `path`.
    fn remove(&mut self, path: &Path) -> Result<(), FsError>;

    /// Rename `src` to `dest`.
    fn rename(&mut self, src: &Path, dest: &Path) -> Result<(), FsError>;

    /// Create an empty file at `path` (truncating an existing one).
    fn create(&mut self, path: &Path) -> Result<(), FsError>;

    /// Last modification time of `path`.
    fn last_write_time(&self, path: &Path) -> Result<SystemTime, FsError>;
}

fn io_err(path: &Path, err: io::Error) -> FsError {
    FsError::Io(format!("{}: {}", path.display(), err))
}

/// The real filesystem.
#[derive(Debug, Default, Clone)]
pub struct StdFileSystem;

impl StdFileSystem {
    /// Create a handle to the real filesystem.
    pub fn new() -> Self {
        Self
    }

    fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<(), FsError> {
        fs::create_dir_all(dest).map_err(|e| io_err(dest, e))?;
        for entry in fs::read_dir(src).map_err(|e| io_err(src, e))? {
            let entry = entry.map_err(|e| io_err(src, e))?;
            let from = entry.path();
            let to = dest.join(entry.file_name());
            if from.is_dir() {
                Self::copy_dir_recursive(&from, &to)?;
            } else {
                fs::copy(&from, &to).map_err(|e| io_err(&from, e))?;
            }
        }
        Ok(())
    }
}

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn copy_overwrite(&mut self, src: &Path, dest: &Path) -> Result<(), FsError> {
        if !src.exists() {
            return Err(FsError::NotFound(src.to_path_buf()));
        }
        if src.is_dir() {
            if dest.exists() {
                self.remove(dest)?;
            }
            Self::copy_dir_recursive(src, dest)
        } else {
            fs::copy(src, dest).map(|_| ()).map_err(|e| io_err(src, e))
        }
    }

    fn move_overwrite(&mut self, src: &Path, dest: &Path) -> Result<(), FsError> {
        if !src.exists() {
            return Err(FsError::NotFound(src.to_path_buf()));
        }
        if dest.exists() {
            self.remove(dest)?;
        }
        // rename fails across filesystems; fall back to copy + remove
        if fs::rename(src, dest).is_err() {
            self.copy_overwrite(src, dest)?;
            self.remove(src)?;
        }
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<(), FsError> {
        if !path.exists() {
            return Err(FsError::NotFound(path.to_path_buf()));
        }
        if path.is_dir() {
            fs::remove_dir_all(path).map_err(|e| io_err(path, e))
        } else {
            fs::remove_file(path).map_err(|e| io_err(path, e))
        }
    }

    fn rename(&mut self, src: &Path, dest: &Path) -> Result<(), FsError> {
        if !src.exists() {
            return Err(FsError::NotFound(src.to_path_buf()));
        }
        fs::rename(src, dest).map_err(|e| io_err(src, e))
    }

    fn create(&mut self, path: &Path) -> Result<(), FsError> {
        fs::File::create(path).map(|_| ()).map_err(|e| io_err(path, e))
    }

    fn last_write_time(&self, path: &Path) -> Result<SystemTime, FsError> {
        let metadata = fs::metadata(path).map_err(|e| io_err(path, e))?;
        metadata.modified().map_err(|e| io_err(path, e))
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    data: Vec<u8>,
    mtime: u64,
}

/// In-memory filesystem for tests and ephemeral use.
///
/// Modification times are a logical clock: every mutation ticks it, and
/// tests can pin a file's time explicitly to drive `sync` either way.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileSystem {
    files: HashMap<PathBuf, MemoryEntry>,
    clock: u64,
}

impl MemoryFileSystem {
    /// Create an empty in-memory filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Write a file with the next logical timestamp.
    pub fn write_file(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let mtime = self.tick();
        self.files.insert(
            path.into(),
            MemoryEntry {
                data: contents.into(),
                mtime,
            },
        );
    }

    /// Read a file's contents.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(|entry| entry.data.as_slice())
    }

    /// Pin a file's modification time to an explicit logical instant.
    pub fn set_mtime(&mut self, path: impl AsRef<Path>, mtime: u64) {
        if let Some(entry) = self.files.get_mut(path.as_ref()) {
            entry.mtime = mtime;
        }
    }

    /// Number of stored files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the filesystem holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn copy_overwrite(&mut self, src: &Path, dest: &Path) -> Result<(), FsError> {
        let data = self
            .files
            .get(src)
            .ok_or_else(|| FsError::NotFound(src.to_path_buf()))?
            .data
            .clone();
        let mtime = self.tick();
        self.files.insert(dest.to_path_buf(), MemoryEntry { data, mtime });
        Ok(())
    }

    fn move_overwrite(&mut self, src: &Path, dest: &Path) -> Result<(), FsError> {
        let entry = self
            .files
            .remove(src)
            .ok_or_else(|| FsError::NotFound(src.to_path_buf()))?;
        self.files.insert(dest.to_path_buf(), entry);
        Ok(())
    }

    fn remove(&mut self, path: &Path) -> Result<(), FsError> {
        self.files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    fn rename(&mut self, src: &Path, dest: &Path) -> Result<(), FsError> {
        self.move_overwrite(src, dest)
    }

    fn create(&mut self, path: &Path) -> Result<(), FsError> {
        let mtime = self.tick();
        self.files.insert(
            path.to_path_buf(),
            MemoryEntry {
                data: Vec::new(),
                mtime,
            },
        );
        Ok(())
    }

    fn last_write_time(&self, path: &Path) -> Result<SystemTime, FsError> {
        self.files
            .get(path)
            .map(|entry| SystemTime::UNIX_EPOCH + Duration::from_secs(entry.mtime))
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_fs_copy_and_read() {
        let mut mem = MemoryFileSystem::new();
        mem.write_file("a.txt", b"hello".to_vec());

        mem.copy_overwrite(Path::new("a.txt"), Path::new("b.txt")).unwrap();
        assert_eq!(mem.read_file("b.txt"), Some(b"hello".as_slice()));
        assert!(mem.exists(Path::new("a.txt")));
    }

    #[test]
    fn test_memory_fs_move_removes_source() {
        let mut mem = MemoryFileSystem::new();
        mem.write_file("a.txt", b"data".to_vec());

        mem.move_overwrite(Path::new("a.txt"), Path::new("b.txt")).unwrap();
        assert!(!mem.exists(Path::new("a.txt")));
        assert_eq!(mem.read_file("b.txt"), Some(b"data".as_slice()));
    }

    #[test]
    fn test_memory_fs_missing_source_errors() {
        let mut mem = MemoryFileSystem::new();
        let err = mem
            .copy_overwrite(Path::new("nope"), Path::new("b"))
            .unwrap_err();
        assert_eq!(err, FsError::NotFound(PathBuf::from("nope")));
    }

    #[test]
    fn test_memory_fs_mtime_ordering() {
        let mut mem = MemoryFileSystem::new();
        mem.write_file("old.txt", b"1".to_vec());
        mem.write_file("new.txt", b"2".to_vec());

        let old = mem.last_write_time(Path::new("old.txt")).unwrap();
        let new = mem.last_write_time(Path::new("new.txt")).unwrap();
        assert!(old < new);

        mem.set_mtime("old.txt", 100);
        let pinned = mem.last_write_time(Path::new("old.txt")).unwrap();
        assert!(pinned > new);
    }

    #[test]
    fn test_std_fs_file_operations() {
        let dir = tempdir().unwrap();
        let mut std_fs = StdFileSystem::new();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.txt");

        fs::write(&a, "payload").unwrap();
        assert!(std_fs.exists(&a));
        assert!(std_fs.last_write_time(&a).is_ok());

        std_fs.copy_overwrite(&a, &b).unwrap();
        assert_eq!(fs::read_to_string(&b).unwrap(), "payload");

        std_fs.rename(&b, &c).unwrap();
        assert!(!c.exists() == false && !b.exists());

        std_fs.move_overwrite(&c, &b).unwrap();
        assert!(b.exists() && !c.exists());

        std_fs.remove(&b).unwrap();
        assert!(!b.exists());
        assert_eq!(
            std_fs.remove(&b),
            Err(FsError::NotFound(b.clone()))
        );

        std_fs.create(&b).unwrap();
        assert_eq!(fs::read(&b).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_std_fs_copies_directories_recursively() {
        let dir = tempdir().unwrap();
        let mut std_fs = StdFileSystem::new();

        let src = dir.path().join("src");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("top.txt"), "top").unwrap();
        fs::write(src.join("sub").join("inner.txt"), "inner").unwrap();

        let dest = dir.path().join("dest");
        std_fs.copy_overwrite(&src, &dest).unwrap();

        assert_eq!(fs::read_to_string(dest.join("top.txt")).unwrap(), "top");
        assert_eq!(
            fs::read_to_string(dest.join("sub").join("inner.txt")).unwrap(),
            "inner"
        );
    }
}
