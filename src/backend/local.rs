//! Local disk adapter.
//!
//! The standard library is the platform wrapper here; this module only
//! adds the pieces `std::fs` does not cover: mtime refresh on touch and
//! advisory whole-file locks.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, VfsError};
use crate::pool::ThreadPool;
use crate::uri::Uri;
use crate::vfs::FileLock;

use super::Backend;

pub struct LocalBackend {
    // Adapter-internal fan-out shares the façade's pool.
    #[allow(dead_code)]
    pool: Arc<ThreadPool>,
}

impl LocalBackend {
    pub fn new(pool: Arc<ThreadPool>) -> LocalBackend {
        LocalBackend { pool }
    }

    fn path<'a>(&self, uri: &'a Uri) -> &'a Path {
        Path::new(uri.to_path())
    }

    /// Takes an advisory whole-file lock, creating the file if needed.
    ///
    /// `shared` requests a read lock; otherwise the lock is exclusive.
    /// The lock lives as long as the returned token keeps the descriptor
    /// open.
    #[cfg(unix)]
    pub fn lock(&self, uri: &Uri, shared: bool) -> Result<FileLock> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(self.path(uri))
            .map_err(|err| VfsError::from_io("filelock_lock", uri, err))?;
        let operation = if shared { libc::LOCK_SH } else { libc::LOCK_EX };
        flock(&file, operation).map_err(|err| VfsError::from_io("filelock_lock", uri, err))?;
        Ok(FileLock::Local { file })
    }

    #[cfg(not(unix))]
    pub fn lock(&self, _uri: &Uri, _shared: bool) -> Result<FileLock> {
        Ok(FileLock::Inert)
    }

    /// Releases a lock taken by [`LocalBackend::lock`].
    pub fn unlock(&self, uri: &Uri, lock: FileLock) -> Result<()> {
        match lock {
            #[cfg(unix)]
            FileLock::Local { file } => {
                flock(&file, libc::LOCK_UN)
                    .map_err(|err| VfsError::from_io("filelock_unlock", uri, err))
            }
            #[cfg(not(unix))]
            FileLock::Local { .. } => {
                let _ = uri;
                Ok(())
            }
            FileLock::Inert => Ok(()),
        }
    }
}

#[cfg(unix)]
fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    // Safety: the descriptor is owned by `file` and stays open across the
    // call.
    if unsafe { libc::flock(file.as_raw_fd(), operation) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl Backend for LocalBackend {
    fn create_dir(&self, uri: &Uri) -> Result<()> {
        let path = self.path(uri);
        if path.is_dir() {
            return Ok(());
        }
        fs::create_dir(path).map_err(|err| VfsError::from_io("create_dir", uri, err))
    }

    fn touch(&self, uri: &Uri) -> Result<()> {
        let path = self.path(uri);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| VfsError::from_io("touch", uri, err))?;
        filetime::set_file_mtime(path, filetime::FileTime::now())
            .map_err(|err| VfsError::from_io("touch", uri, err))
    }

    fn remove_dir(&self, uri: &Uri) -> Result<()> {
        fs::remove_dir_all(self.path(uri))
            .map_err(|err| VfsError::from_io("remove_dir", uri, err))
    }

    fn remove_file(&self, uri: &Uri) -> Result<()> {
        fs::remove_file(self.path(uri))
            .map_err(|err| VfsError::from_io("remove_file", uri, err))
    }

    fn ls(&self, uri: &Uri) -> Result<Vec<Uri>> {
        let entries =
            fs::read_dir(self.path(uri)).map_err(|err| VfsError::from_io("ls", uri, err))?;

        let mut children = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| VfsError::from_io("ls", uri, err))?;
            children.push(uri.join(&entry.file_name().to_string_lossy()));
        }
        Ok(children)
    }

    fn file_size(&self, uri: &Uri) -> Result<u64> {
        let metadata = fs::metadata(self.path(uri))
            .map_err(|err| VfsError::from_io("file_size", uri, err))?;
        if metadata.is_dir() {
            return Err(VfsError::Backend {
                op: "file_size",
                uri: uri.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "is a directory"),
            });
        }
        Ok(metadata.len())
    }

    fn is_dir(&self, uri: &Uri) -> Result<bool> {
        match fs::metadata(self.path(uri)) {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(VfsError::from_io("is_dir", uri, err)),
        }
    }

    fn is_file(&self, uri: &Uri) -> Result<bool> {
        match fs::metadata(self.path(uri)) {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(VfsError::from_io("is_file", uri, err)),
        }
    }

    fn read(&self, uri: &Uri, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut file =
            File::open(self.path(uri)).map_err(|err| VfsError::from_io("read", uri, err))?;
        file.seek(SeekFrom::Start(offset)).map_err(|err| VfsError::from_io("read", uri, err))?;
        file.read_exact(buf).map_err(|err| VfsError::from_io("read", uri, err))
    }

    fn write(&self, uri: &Uri, buf: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(uri))
            .map_err(|err| VfsError::from_io("write", uri, err))?;
        file.write_all(buf).map_err(|err| VfsError::from_io("write", uri, err))
    }

    fn sync(&self, uri: &Uri) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(self.path(uri))
            .map_err(|err| VfsError::from_io("sync", uri, err))?;
        file.sync_all().map_err(|err| VfsError::from_io("sync", uri, err))
    }

    fn move_path(&self, old: &Uri, new: &Uri) -> Result<()> {
        fs::rename(self.path(old), self.path(new))
            .map_err(|err| VfsError::from_io("move", old, err))
    }

    fn close(&self, uri: &Uri) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .open(self.path(uri))
            .map_err(|err| VfsError::from_io("close_file", uri, err))?;
        file.sync_all().map_err(|err| VfsError::from_io("close_file", uri, err))
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;

    fn backend() -> LocalBackend {
        LocalBackend::new(Arc::new(ThreadPool::new(1)))
    }

    fn uri_for(path: &std::path::Path) -> Uri {
        Uri::new(path.to_string_lossy().as_ref())
    }

    #[test]
    fn touch_then_stat() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend();
        let uri = uri_for(&dir.path().join("x"));

        backend.touch(&uri).unwrap();
        assert!(backend.is_file(&uri).unwrap());
        assert_eq!(backend.file_size(&uri).unwrap(), 0);
    }

    #[test]
    fn write_is_append_style() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend();
        let uri = uri_for(&dir.path().join("x"));

        backend.write(&uri, b"hel").unwrap();
        backend.write(&uri, b"lo").unwrap();

        let mut buf = [0u8; 5];
        backend.read(&uri, 0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn file_size_of_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend();
        let uri = uri_for(dir.path());

        assert!(matches!(backend.file_size(&uri), Err(VfsError::Backend { .. })));
    }

    #[test]
    fn missing_entries_report_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend();
        let uri = uri_for(&dir.path().join("absent"));

        assert!(!backend.is_file(&uri).unwrap());
        assert!(matches!(backend.file_size(&uri), Err(VfsError::NotFound { .. })));
        assert!(matches!(backend.remove_file(&uri), Err(VfsError::NotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn shared_locks_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend();
        let uri = uri_for(&dir.path().join("lockfile"));

        let first = backend.lock(&uri, true).unwrap();
        let second = backend.lock(&uri, true).unwrap();
        backend.unlock(&uri, first).unwrap();
        backend.unlock(&uri, second).unwrap();
    }
}
