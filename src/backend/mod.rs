//! Storage backend adapters and the operation set they share.

pub mod local;

#[cfg(feature = "hdfs")]
pub mod hdfs;
#[cfg(feature = "s3")]
pub mod s3;

use crate::error::Result;
use crate::uri::Uri;

/// The uniform operation set every backend adapter implements.
///
/// Adapters translate these calls into their driver's vocabulary and map
/// driver failures into the crate's error taxonomy. The façade owns the
/// adapters; an adapter never sees a URI of a foreign scheme.
pub trait Backend: Send + Sync {
    /// Creates a directory. A no-op on object stores, which have none.
    /// Creating a directory that already exists is not an error.
    fn create_dir(&self, uri: &Uri) -> Result<()>;

    /// Creates an empty entry if absent; refreshes it if present. What
    /// "refresh" means is backend-specific (mtime on local disk, nothing
    /// on object stores).
    fn touch(&self, uri: &Uri) -> Result<()>;

    /// Removes a directory and everything below it.
    fn remove_dir(&self, uri: &Uri) -> Result<()>;

    /// Removes a single file or object.
    fn remove_file(&self, uri: &Uri) -> Result<()>;

    /// Immediate children of `uri`, in no particular order.
    fn ls(&self, uri: &Uri) -> Result<Vec<Uri>>;

    /// Size in bytes of the file or object. Directories have no size.
    fn file_size(&self, uri: &Uri) -> Result<u64>;

    fn is_dir(&self, uri: &Uri) -> Result<bool>;

    fn is_file(&self, uri: &Uri) -> Result<bool>;

    /// Fills `buf` from `offset`. Short data is an error, never a partial
    /// success.
    fn read(&self, uri: &Uri, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Appends `buf` to the entry's write path. Object stores accumulate
    /// into a per-URI buffer that [`Backend::close`] commits.
    fn write(&self, uri: &Uri, buf: &[u8]) -> Result<()>;

    /// Flushes pending data for the URI.
    fn sync(&self, uri: &Uri) -> Result<()>;

    /// Renames `old` to `new` within this backend.
    fn move_path(&self, old: &Uri, new: &Uri) -> Result<()>;

    /// Finishes writing: fsync on local disk, flush on HDFS, object
    /// commit on S3.
    fn close(&self, uri: &Uri) -> Result<()>;
}

/// Driver connectors installed before `init`.
///
/// The low-level clients live outside this crate; a connector is how the
/// lifecycle obtains one once the configuration is known. A build that
/// enables a remote backend but installs no connector fails `init`.
#[derive(Default)]
pub struct Drivers {
    #[cfg(feature = "hdfs")]
    pub hdfs: Option<Box<dyn hdfs::HdfsConnector>>,
    #[cfg(feature = "s3")]
    pub s3: Option<Box<dyn s3::S3Connector>>,
}
