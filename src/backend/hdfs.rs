//! HDFS adapter.
//!
//! The HDFS client itself lives outside this crate; the adapter talks to
//! it through [`HdfsClient`], mapping URIs to name-node paths and driver
//! failures into the crate's error taxonomy. Directory create/remove and
//! rename are atomic metadata operations on HDFS; reads are
//! range-seekable and writes are sequential appends.

use std::io;
use std::sync::Arc;

use crate::config::HdfsParams;
use crate::error::{Result, VfsError};
use crate::uri::Uri;

use super::Backend;

/// Entry metadata reported by the driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HdfsStat {
    pub is_dir: bool,
    pub len: u64,
}

/// Low-level HDFS driver interface.
///
/// Paths are absolute name-node paths, already stripped of scheme and
/// authority. Implementations must be shareable across the worker pool.
pub trait HdfsClient: Send + Sync {
    /// Creates a directory, including missing parents.
    fn create_dir(&self, path: &str) -> io::Result<()>;

    /// Removes a directory tree.
    fn remove_dir_all(&self, path: &str) -> io::Result<()>;

    /// Creates an empty file. Fails if the path already exists.
    fn create_empty(&self, path: &str) -> io::Result<()>;

    fn remove_file(&self, path: &str) -> io::Result<()>;

    /// Metadata for `path`, or `None` when the path does not exist.
    fn stat(&self, path: &str) -> io::Result<Option<HdfsStat>>;

    /// Absolute paths of the immediate children of a directory.
    fn list_dir(&self, path: &str) -> io::Result<Vec<String>>;

    /// Fills `buf` starting at `offset`.
    fn read_at(&self, path: &str, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// Appends to the file, creating it when absent.
    fn append(&self, path: &str, data: &[u8]) -> io::Result<()>;

    /// Atomic rename.
    fn rename(&self, from: &str, to: &str) -> io::Result<()>;

    /// Forces buffered writes out to the data nodes.
    fn flush(&self, path: &str) -> io::Result<()>;
}

/// Builds an [`HdfsClient`] from connection parameters at `init` time.
pub trait HdfsConnector: Send + Sync {
    fn connect(&self, params: &HdfsParams) -> io::Result<Arc<dyn HdfsClient>>;
}

pub struct HdfsBackend {
    client: Arc<dyn HdfsClient>,
}

impl HdfsBackend {
    pub fn new(client: Arc<dyn HdfsClient>) -> HdfsBackend {
        HdfsBackend { client }
    }

    fn stat(&self, op: &'static str, uri: &Uri) -> Result<Option<HdfsStat>> {
        self.client.stat(uri.path()).map_err(|err| VfsError::from_io(op, uri, err))
    }
}

impl Backend for HdfsBackend {
    fn create_dir(&self, uri: &Uri) -> Result<()> {
        if let Some(stat) = self.stat("create_dir", uri)? {
            if stat.is_dir {
                return Ok(());
            }
        }
        self.client
            .create_dir(uri.path())
            .map_err(|err| VfsError::from_io("create_dir", uri, err))
    }

    fn touch(&self, uri: &Uri) -> Result<()> {
        if self.stat("touch", uri)?.is_some() {
            return Ok(());
        }
        self.client.create_empty(uri.path()).map_err(|err| VfsError::from_io("touch", uri, err))
    }

    fn remove_dir(&self, uri: &Uri) -> Result<()> {
        if self.stat("remove_dir", uri)?.is_none() {
            return Err(VfsError::not_found("remove_dir", uri));
        }
        self.client
            .remove_dir_all(uri.path())
            .map_err(|err| VfsError::from_io("remove_dir", uri, err))
    }

    fn remove_file(&self, uri: &Uri) -> Result<()> {
        if self.stat("remove_file", uri)?.is_none() {
            return Err(VfsError::not_found("remove_file", uri));
        }
        self.client
            .remove_file(uri.path())
            .map_err(|err| VfsError::from_io("remove_file", uri, err))
    }

    fn ls(&self, uri: &Uri) -> Result<Vec<Uri>> {
        let authority = uri.authority().unwrap_or("");
        let children =
            self.client.list_dir(uri.path()).map_err(|err| VfsError::from_io("ls", uri, err))?;
        Ok(children
            .into_iter()
            .map(|path| Uri::new(format!("hdfs://{authority}{path}")))
            .collect())
    }

    fn file_size(&self, uri: &Uri) -> Result<u64> {
        match self.stat("file_size", uri)? {
            None => Err(VfsError::not_found("file_size", uri)),
            Some(stat) if stat.is_dir => Err(VfsError::Backend {
                op: "file_size",
                uri: uri.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "is a directory"),
            }),
            Some(stat) => Ok(stat.len),
        }
    }

    fn is_dir(&self, uri: &Uri) -> Result<bool> {
        Ok(self.stat("is_dir", uri)?.map(|stat| stat.is_dir).unwrap_or(false))
    }

    fn is_file(&self, uri: &Uri) -> Result<bool> {
        Ok(self.stat("is_file", uri)?.map(|stat| !stat.is_dir).unwrap_or(false))
    }

    fn read(&self, uri: &Uri, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.client
            .read_at(uri.path(), offset, buf)
            .map_err(|err| VfsError::from_io("read", uri, err))
    }

    fn write(&self, uri: &Uri, buf: &[u8]) -> Result<()> {
        self.client.append(uri.path(), buf).map_err(|err| VfsError::from_io("write", uri, err))
    }

    fn sync(&self, uri: &Uri) -> Result<()> {
        self.client.flush(uri.path()).map_err(|err| VfsError::from_io("sync", uri, err))
    }

    fn move_path(&self, old: &Uri, new: &Uri) -> Result<()> {
        self.client
            .rename(old.path(), new.path())
            .map_err(|err| VfsError::from_io("move", old, err))
    }

    fn close(&self, uri: &Uri) -> Result<()> {
        self.client.flush(uri.path()).map_err(|err| VfsError::from_io("close_file", uri, err))
    }
}
