//! The virtual file system façade: lifecycle, scheme dispatch, and the
//! public operation surface.

use std::io;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::local::LocalBackend;
use crate::backend::{Backend, Drivers};
use crate::capability::{BackendKind, SupportedSet};
use crate::config::VfsParams;
use crate::error::{Result, VfsError};
use crate::plan;
use crate::pool::ThreadPool;
use crate::uri::{Scheme, Uri};

#[cfg(feature = "hdfs")]
use crate::backend::hdfs::HdfsBackend;
#[cfg(feature = "s3")]
use crate::backend::s3::S3Backend;

/// Mode a file is opened in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VfsMode {
    Read,
    Write,
    Append,
}

/// Token returned by [`Vfs::filelock_lock`].
///
/// On local schemes the token holds the locked descriptor open; dropping
/// it releases the lock. Remote schemes get an inert token so the lock
/// API has one shape everywhere.
#[derive(Debug)]
pub enum FileLock {
    Local { file: std::fs::File },
    Inert,
}

/// A unified virtual file system over local disk, HDFS and S3.
///
/// A `Vfs` is created uninitialized: it knows which backends the build
/// carries, but serves no I/O until [`Vfs::init`] connects them. Every
/// operation takes a [`Uri`] and routes on its scheme alone; an operation
/// either succeeds or returns one well-typed [`VfsError`], never both and
/// never a silent partial result.
pub struct Vfs {
    supported: SupportedSet,
    drivers: Drivers,
    runtime: Option<Runtime>,
}

/// State that exists only between `init` and `shutdown`.
struct Runtime {
    params: VfsParams,
    pool: Arc<ThreadPool>,
    local: Arc<LocalBackend>,
    #[cfg(feature = "hdfs")]
    hdfs: Arc<HdfsBackend>,
    #[cfg(feature = "s3")]
    s3: Arc<S3Backend>,
}

/// Outcome of scheme dispatch: a borrow of the one adapter that serves
/// the URI.
#[derive(Copy, Clone)]
enum Route<'a> {
    Local(&'a Arc<LocalBackend>),
    #[cfg(feature = "hdfs")]
    Hdfs(&'a Arc<HdfsBackend>),
    #[cfg(feature = "s3")]
    S3(&'a Arc<S3Backend>),
}

impl<'a> Route<'a> {
    fn backend(&self) -> &'a dyn Backend {
        match *self {
            Route::Local(b) => b.as_ref(),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(b) => b.as_ref(),
            #[cfg(feature = "s3")]
            Route::S3(b) => b.as_ref(),
        }
    }

    fn shared(&self) -> Arc<dyn Backend> {
        match *self {
            Route::Local(b) => Arc::clone(b) as Arc<dyn Backend>,
            #[cfg(feature = "hdfs")]
            Route::Hdfs(b) => Arc::clone(b) as Arc<dyn Backend>,
            #[cfg(feature = "s3")]
            Route::S3(b) => Arc::clone(b) as Arc<dyn Backend>,
        }
    }
}

/// Raw base pointer of a read buffer, carried into pool tasks.
#[derive(Copy, Clone)]
struct SendPtr(*mut u8);

// Safety: each task receives a sub-range that the planner guarantees to
// be disjoint from every other task's, and the submitting call blocks
// until all tasks have finished, keeping the buffer alive.
unsafe impl Send for SendPtr {}

impl Vfs {
    /// A VFS with no remote drivers installed.
    pub fn new() -> Vfs {
        Vfs::with_drivers(Drivers::default())
    }

    /// A VFS with the given driver connectors; they are consulted during
    /// [`Vfs::init`].
    pub fn with_drivers(drivers: Drivers) -> Vfs {
        Vfs { supported: SupportedSet::for_build(), drivers, runtime: None }
    }

    /// Whether this build carries the given backend.
    pub fn supports_fs(&self, kind: BackendKind) -> bool {
        self.supported.supports(kind)
    }

    /// The configuration `init` was called with, while initialized.
    pub fn config(&self) -> Option<&VfsParams> {
        self.runtime.as_ref().map(|rt| &rt.params)
    }

    /// Connects the compiled backends and sizes the worker pool.
    ///
    /// On failure the first failing step's error is returned and the VFS
    /// stays uninitialized.
    pub fn init(&mut self, params: VfsParams) -> Result<()> {
        if self.runtime.is_some() {
            return Err(VfsError::InvalidConfig("init called on an initialized instance".into()));
        }
        params.validate()?;

        let pool = Arc::new(ThreadPool::new(params.max_parallel_ops));

        #[cfg(feature = "hdfs")]
        let hdfs = {
            let connector = self
                .drivers
                .hdfs
                .as_ref()
                .ok_or_else(|| init_error("hdfs://", missing_driver("HDFS")))?;
            let client =
                connector.connect(&params.hdfs).map_err(|err| init_error("hdfs://", err))?;
            Arc::new(HdfsBackend::new(client))
        };

        #[cfg(feature = "s3")]
        let s3 = {
            let connector = self
                .drivers
                .s3
                .as_ref()
                .ok_or_else(|| init_error("s3://", missing_driver("S3")))?;
            let client = connector.connect(&params.s3).map_err(|err| init_error("s3://", err))?;
            Arc::new(S3Backend::new(client, &params.s3))
        };

        let local = Arc::new(LocalBackend::new(Arc::clone(&pool)));

        info!(
            pool_size = params.max_parallel_ops,
            backends = ?self.supported,
            "virtual file system initialized"
        );

        self.runtime = Some(Runtime {
            params,
            pool,
            local,
            #[cfg(feature = "hdfs")]
            hdfs,
            #[cfg(feature = "s3")]
            s3,
        });
        Ok(())
    }

    /// Releases the worker pool and all adapter state.
    ///
    /// Remote clients are dropped, not disconnected; their drivers release
    /// resources in their own `Drop`. Operations after shutdown fail with
    /// [`VfsError::NotInitialized`].
    pub fn shutdown(&mut self) {
        if self.runtime.take().is_some() {
            info!("virtual file system shut down");
        }
    }

    fn runtime(&self, op: &'static str, uri: &Uri) -> Result<&Runtime> {
        self.runtime.as_ref().ok_or_else(|| VfsError::not_initialized(op, uri))
    }

    fn route(&self, op: &'static str, uri: &Uri) -> Result<Route<'_>> {
        let rt = self.runtime(op, uri)?;
        match uri.scheme() {
            Scheme::File => Ok(Route::Local(&rt.local)),
            Scheme::Hdfs => {
                #[cfg(feature = "hdfs")]
                return Ok(Route::Hdfs(&rt.hdfs));
                #[cfg(not(feature = "hdfs"))]
                return Err(VfsError::not_built(op, BackendKind::Hdfs, uri));
            }
            Scheme::S3 => {
                #[cfg(feature = "s3")]
                return Ok(Route::S3(&rt.s3));
                #[cfg(not(feature = "s3"))]
                return Err(VfsError::not_built(op, BackendKind::S3, uri));
            }
            Scheme::Other => Err(VfsError::unsupported(op, uri)),
        }
    }

    /// Normalizes a caller-supplied path into URI form.
    ///
    /// Strings that already carry a scheme pass through unchanged; bare
    /// host paths are made absolute, cleaned of `.`/`..` segments and
    /// prefixed with `file://`. No I/O is performed.
    pub fn abs_path(&self, path: &str) -> String {
        if path.contains("://") {
            return path.to_string();
        }

        #[cfg(windows)]
        if is_drive_path(path) {
            return format!("file:///{}", path.replace('\\', "/"));
        }

        if path.starts_with('/') {
            format!("file://{}", normalize_path(path))
        } else {
            let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("/"));
            format!("file://{}", normalize_path(&format!("{}/{path}", cwd.to_string_lossy())))
        }
    }

    /// Creates a directory; succeeds if it already exists. A no-op on S3,
    /// which has no directories.
    pub fn create_dir(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "create_dir");
        self.route("create_dir", uri)?.backend().create_dir(uri)
    }

    /// Creates an empty entry if absent. An existing local file gets its
    /// mtime refreshed; an existing object is left untouched.
    pub fn touch(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "touch");
        self.route("touch", uri)?.backend().touch(uri)
    }

    /// Removes the directory and everything below it.
    pub fn remove_dir(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "remove_dir");
        self.route("remove_dir", uri)?.backend().remove_dir(uri)
    }

    /// Removes a single file or object.
    pub fn remove_file(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "remove_file");
        self.route("remove_file", uri)?.backend().remove_file(uri)
    }

    pub fn is_dir(&self, uri: &Uri) -> Result<bool> {
        self.route("is_dir", uri)?.backend().is_dir(uri)
    }

    pub fn is_file(&self, uri: &Uri) -> Result<bool> {
        self.route("is_file", uri)?.backend().is_file(uri)
    }

    /// Size in bytes of a file or object. Directories and missing entries
    /// are errors.
    pub fn file_size(&self, uri: &Uri) -> Result<u64> {
        self.route("file_size", uri)?.backend().file_size(uri)
    }

    /// Immediate children of `parent`, sorted byte-wise ascending with
    /// duplicates removed.
    pub fn ls(&self, parent: &Uri) -> Result<Vec<Uri>> {
        let mut children = self.route("ls", parent)?.backend().ls(parent)?;
        children.sort();
        children.dedup();
        Ok(children)
    }

    /// Moves a file within one scheme. An existing destination file is
    /// removed first.
    pub fn move_file(&self, old: &Uri, new: &Uri) -> Result<()> {
        debug!(old = %old, new = %new, "move_file");
        let route = self.route("move_file", old)?;
        if old.scheme() != new.scheme() {
            return Err(VfsError::CrossSchemeUnsupported {
                from: old.to_string(),
                to: new.to_string(),
            });
        }
        let backend = route.backend();
        if backend.is_file(new)? {
            backend.remove_file(new)?;
        }
        backend.move_path(old, new)
    }

    /// Moves a directory within one scheme. On S3 every object under the
    /// prefix is renamed; elsewhere this is a single rename.
    pub fn move_dir(&self, old: &Uri, new: &Uri) -> Result<()> {
        debug!(old = %old, new = %new, "move_dir");
        let route = self.route("move_dir", old)?;
        if old.scheme() != new.scheme() {
            return Err(VfsError::CrossSchemeUnsupported {
                from: old.to_string(),
                to: new.to_string(),
            });
        }
        match route {
            Route::Local(local) => local.move_path(old, new),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(hdfs) => hdfs.move_path(old, new),
            #[cfg(feature = "s3")]
            Route::S3(s3) => s3.move_dir(old, new),
        }
    }

    /// Fills `buf` from `uri` starting at `offset`.
    ///
    /// Reads of at least `min_parallel_size` bytes fan out over the worker
    /// pool in disjoint sub-ranges; smaller reads run on the caller's
    /// thread. Either the whole buffer is filled or an error is returned;
    /// after a [`VfsError::ParallelRead`] the buffer contents are
    /// unspecified.
    pub fn read(&self, uri: &Uri, offset: u64, buf: &mut [u8]) -> Result<()> {
        debug!(uri = %uri, offset, nbytes = buf.len(), "read");
        let route = self.route("read", uri)?;
        if buf.is_empty() {
            return Ok(());
        }

        let rt = self.runtime("read", uri)?;
        let slices = plan::plan_read(buf.len(), rt.params.min_parallel_size, rt.pool.size());
        if slices.len() <= 1 {
            return route.backend().read(uri, offset, buf);
        }

        let backend = route.shared();
        let base = SendPtr(buf.as_mut_ptr());
        let handles: Vec<_> = slices
            .iter()
            .map(|slice| {
                let backend = Arc::clone(&backend);
                let uri = uri.clone();
                let slice = *slice;
                rt.pool.execute(move || {
                    let base = base;
                    // Safety: `slice` is one of the planner's pairwise
                    // disjoint, in-bounds sub-ranges of the caller's
                    // buffer, which outlives this task (see `SendPtr`).
                    let sub = unsafe {
                        std::slice::from_raw_parts_mut(base.0.add(slice.begin), slice.nbytes)
                    };
                    backend.read(&uri, offset + slice.begin as u64, sub)
                })
            })
            .collect();

        // Every task is awaited even after a failure; there is no
        // cancellation.
        let mut first_failure: Option<String> = None;
        for handle in handles {
            let outcome = match handle.wait() {
                Some(outcome) => outcome,
                None => Err(VfsError::Backend {
                    op: "read",
                    uri: uri.to_string(),
                    source: io::Error::new(io::ErrorKind::Other, "worker pool shut down"),
                }),
            };
            if let Err(err) = outcome {
                warn!(uri = %uri, error = %err, "sub-range read failed");
                if first_failure.is_none() {
                    first_failure = Some(err.to_string());
                }
            }
        }
        match first_failure {
            None => Ok(()),
            Some(message) => Err(VfsError::ParallelRead { uri: uri.to_string(), message }),
        }
    }

    /// Appends `buf` to the entry's write path. On S3 the bytes accumulate
    /// in the adapter and reach the store on [`Vfs::close_file`].
    pub fn write(&self, uri: &Uri, buf: &[u8]) -> Result<()> {
        debug!(uri = %uri, nbytes = buf.len(), "write");
        self.route("write", uri)?.backend().write(uri, buf)
    }

    /// Flushes pending data. A no-op on S3, whose final flush happens on
    /// close.
    pub fn sync(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "sync");
        self.route("sync", uri)?.backend().sync(uri)
    }

    /// Validates that `uri` can be opened in `mode`.
    ///
    /// `Read` requires the file to exist. `Write` truncates: an existing
    /// file is removed first. `Append` is rejected on S3.
    pub fn open_file(&self, uri: &Uri, mode: VfsMode) -> Result<()> {
        debug!(uri = %uri, ?mode, "open_file");
        let route = self.route("open_file", uri)?;
        match mode {
            VfsMode::Read => {
                if route.backend().is_file(uri)? {
                    Ok(())
                } else {
                    Err(VfsError::not_found("open_file", uri))
                }
            }
            VfsMode::Write => {
                if route.backend().is_file(uri)? {
                    route.backend().remove_file(uri)?;
                }
                Ok(())
            }
            VfsMode::Append => {
                if uri.is_s3() {
                    Err(VfsError::AppendUnsupported { uri: uri.to_string() })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Finishes writing to `uri`: fsync locally, flush on HDFS, commit the
    /// accumulated object on S3. Writing again before a new
    /// [`Vfs::open_file`] is undefined.
    pub fn close_file(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "close_file");
        self.route("close_file", uri)?.backend().close(uri)
    }

    /// Takes an advisory lock on a local file; `shared` requests a read
    /// lock. On remote schemes this is a no-op returning an inert token.
    pub fn filelock_lock(&self, uri: &Uri, shared: bool) -> Result<FileLock> {
        debug!(uri = %uri, shared, "filelock_lock");
        match self.route("filelock_lock", uri)? {
            Route::Local(local) => local.lock(uri, shared),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(_) => Ok(FileLock::Inert),
            #[cfg(feature = "s3")]
            Route::S3(_) => Ok(FileLock::Inert),
        }
    }

    /// Releases a lock taken by [`Vfs::filelock_lock`].
    pub fn filelock_unlock(&self, uri: &Uri, lock: FileLock) -> Result<()> {
        debug!(uri = %uri, "filelock_unlock");
        match self.route("filelock_unlock", uri)? {
            Route::Local(local) => local.unlock(uri, lock),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(_) => Ok(()),
            #[cfg(feature = "s3")]
            Route::S3(_) => Ok(()),
        }
    }

    /// Creates a bucket. Defined only for `s3://` URIs.
    pub fn create_bucket(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "create_bucket");
        match self.route("create_bucket", uri)? {
            #[cfg(feature = "s3")]
            Route::S3(s3) => s3.create_bucket(uri),
            Route::Local(_) => Err(VfsError::unsupported("create_bucket", uri)),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(_) => Err(VfsError::unsupported("create_bucket", uri)),
        }
    }

    /// Removes an empty bucket. Defined only for `s3://` URIs.
    pub fn remove_bucket(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "remove_bucket");
        match self.route("remove_bucket", uri)? {
            #[cfg(feature = "s3")]
            Route::S3(s3) => s3.remove_bucket(uri),
            Route::Local(_) => Err(VfsError::unsupported("remove_bucket", uri)),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(_) => Err(VfsError::unsupported("remove_bucket", uri)),
        }
    }

    /// Deletes every object in the bucket. Defined only for `s3://` URIs.
    pub fn empty_bucket(&self, uri: &Uri) -> Result<()> {
        debug!(uri = %uri, "empty_bucket");
        match self.route("empty_bucket", uri)? {
            #[cfg(feature = "s3")]
            Route::S3(s3) => s3.empty_bucket(uri),
            Route::Local(_) => Err(VfsError::unsupported("empty_bucket", uri)),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(_) => Err(VfsError::unsupported("empty_bucket", uri)),
        }
    }

    /// Whether the bucket holds no objects. Defined only for `s3://` URIs.
    pub fn is_empty_bucket(&self, uri: &Uri) -> Result<bool> {
        match self.route("is_empty_bucket", uri)? {
            #[cfg(feature = "s3")]
            Route::S3(s3) => s3.is_empty_bucket(uri),
            Route::Local(_) => Err(VfsError::unsupported("is_empty_bucket", uri)),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(_) => Err(VfsError::unsupported("is_empty_bucket", uri)),
        }
    }

    /// Whether the bucket exists. Defined only for `s3://` URIs.
    pub fn is_bucket(&self, uri: &Uri) -> Result<bool> {
        match self.route("is_bucket", uri)? {
            #[cfg(feature = "s3")]
            Route::S3(s3) => s3.is_bucket(uri),
            Route::Local(_) => Err(VfsError::unsupported("is_bucket", uri)),
            #[cfg(feature = "hdfs")]
            Route::Hdfs(_) => Err(VfsError::unsupported("is_bucket", uri)),
        }
    }
}

impl Default for Vfs {
    fn default() -> Self {
        Vfs::new()
    }
}

#[cfg(any(feature = "hdfs", feature = "s3"))]
fn init_error(uri: &str, source: io::Error) -> VfsError {
    VfsError::Backend { op: "init", uri: uri.to_string(), source }
}

#[cfg(any(feature = "hdfs", feature = "s3"))]
fn missing_driver(backend: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no {backend} driver installed"))
}

/// Collapses `.`, `..` and repeated separators; the result always starts
/// with `/`.
fn normalize_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            segment => stack.push(segment),
        }
    }
    format!("/{}", stack.join("/"))
}

#[cfg(windows)]
fn is_drive_path(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(normalize_path("/a/b/../c/./d"), "/a/c/d");
        assert_eq!(normalize_path("/a//b/"), "/a/b");
        assert_eq!(normalize_path("/.."), "/");
    }

    #[test]
    fn abs_path_passes_through_uris() {
        let vfs = Vfs::new();
        assert_eq!(vfs.abs_path("s3://bucket/k"), "s3://bucket/k");
        assert_eq!(vfs.abs_path("hdfs://nn/a"), "hdfs://nn/a");
        assert_eq!(vfs.abs_path("file:///tmp/x"), "file:///tmp/x");
    }

    #[test]
    fn abs_path_prefixes_host_paths() {
        let vfs = Vfs::new();
        assert_eq!(vfs.abs_path("/tmp/x"), "file:///tmp/x");
        assert_eq!(vfs.abs_path("/tmp/a/../b"), "file:///tmp/b");
    }

    #[test]
    fn abs_path_absolutizes_relative_paths() {
        let vfs = Vfs::new();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(
            vfs.abs_path("data/file"),
            format!("file://{}/data/file", cwd.to_string_lossy())
        );
    }

    #[test]
    fn operations_before_init_fail() {
        let vfs = Vfs::new();
        let uri = Uri::new("file:///tmp/x");
        assert!(matches!(vfs.is_file(&uri), Err(VfsError::NotInitialized { op: "is_file", .. })));
        assert!(matches!(
            vfs.read(&uri, 0, &mut [0u8; 4]),
            Err(VfsError::NotInitialized { op: "read", .. })
        ));
    }
}
