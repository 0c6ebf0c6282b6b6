//! In-memory driver doubles.
//!
//! These back the crate's own tests and let downstream code exercise the
//! façade without a name node or an object store on hand. They implement
//! the driver traits faithfully enough for semantics tests: prefix
//! listings, copy/delete, ranged reads with bounds checking.

use std::io;

#[cfg(feature = "hdfs")]
pub use self::hdfs::{MemHdfs, StaticHdfsConnector};
#[cfg(feature = "s3")]
pub use self::s3::{FlakyS3, MemS3, StaticS3Connector};

#[allow(dead_code)]
fn not_found(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, what.to_string())
}

#[allow(dead_code)]
fn already_exists(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::AlreadyExists, what.to_string())
}

#[cfg(feature = "s3")]
mod s3 {
    use std::collections::{BTreeMap, BTreeSet};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::backend::s3::{Listing, S3Client, S3Connector};
    use crate::config::S3Params;

    use super::{already_exists, not_found};

    /// Connector handing out one pre-built client, ignoring the
    /// connection parameters.
    pub struct StaticS3Connector(pub Arc<dyn S3Client>);

    impl S3Connector for StaticS3Connector {
        fn connect(&self, _params: &S3Params) -> io::Result<Arc<dyn S3Client>> {
            Ok(self.0.clone())
        }
    }

    /// An object store held entirely in memory.
    #[derive(Default)]
    pub struct MemS3 {
        buckets: Mutex<BTreeMap<String, BTreeMap<String, Vec<u8>>>>,
    }

    impl MemS3 {
        pub fn new() -> MemS3 {
            MemS3::default()
        }

        /// Snapshot of the keys in a bucket, for assertions.
        pub fn keys(&self, bucket: &str) -> Vec<String> {
            self.buckets
                .lock()
                .expect("bucket lock")
                .get(bucket)
                .map(|objects| objects.keys().cloned().collect())
                .unwrap_or_default()
        }

        /// Object body, for assertions.
        pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
            self.buckets
                .lock()
                .expect("bucket lock")
                .get(bucket)
                .and_then(|objects| objects.get(key).cloned())
        }
    }

    impl S3Client for MemS3 {
        fn create_bucket(&self, bucket: &str) -> io::Result<()> {
            let mut buckets = self.buckets.lock().expect("bucket lock");
            if buckets.contains_key(bucket) {
                return Err(already_exists("bucket exists"));
            }
            buckets.insert(bucket.to_string(), BTreeMap::new());
            Ok(())
        }

        fn remove_bucket(&self, bucket: &str) -> io::Result<()> {
            let mut buckets = self.buckets.lock().expect("bucket lock");
            match buckets.get(bucket) {
                None => Err(not_found("no such bucket")),
                Some(objects) if !objects.is_empty() => {
                    Err(io::Error::new(io::ErrorKind::Other, "bucket not empty"))
                }
                Some(_) => {
                    buckets.remove(bucket);
                    Ok(())
                }
            }
        }

        fn bucket_exists(&self, bucket: &str) -> io::Result<bool> {
            Ok(self.buckets.lock().expect("bucket lock").contains_key(bucket))
        }

        fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> io::Result<()> {
            let mut buckets = self.buckets.lock().expect("bucket lock");
            let objects = buckets.get_mut(bucket).ok_or_else(|| not_found("no such bucket"))?;
            objects.insert(key.to_string(), body.to_vec());
            Ok(())
        }

        fn head_object(&self, bucket: &str, key: &str) -> io::Result<Option<u64>> {
            Ok(self
                .buckets
                .lock()
                .expect("bucket lock")
                .get(bucket)
                .and_then(|objects| objects.get(key))
                .map(|body| body.len() as u64))
        }

        fn read_object_range(
            &self,
            bucket: &str,
            key: &str,
            offset: u64,
            buf: &mut [u8],
        ) -> io::Result<()> {
            let buckets = self.buckets.lock().expect("bucket lock");
            let body = buckets
                .get(bucket)
                .and_then(|objects| objects.get(key))
                .ok_or_else(|| not_found("no such object"))?;
            let offset = offset as usize;
            if offset + buf.len() > body.len() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "range past end of object",
                ));
            }
            buf.copy_from_slice(&body[offset..offset + buf.len()]);
            Ok(())
        }

        fn delete_object(&self, bucket: &str, key: &str) -> io::Result<()> {
            let mut buckets = self.buckets.lock().expect("bucket lock");
            let objects = buckets.get_mut(bucket).ok_or_else(|| not_found("no such bucket"))?;
            objects.remove(key);
            Ok(())
        }

        fn copy_object(
            &self,
            src_bucket: &str,
            src_key: &str,
            dst_bucket: &str,
            dst_key: &str,
        ) -> io::Result<()> {
            let mut buckets = self.buckets.lock().expect("bucket lock");
            let body = buckets
                .get(src_bucket)
                .and_then(|objects| objects.get(src_key))
                .ok_or_else(|| not_found("no such object"))?
                .clone();
            let objects =
                buckets.get_mut(dst_bucket).ok_or_else(|| not_found("no such bucket"))?;
            objects.insert(dst_key.to_string(), body);
            Ok(())
        }

        fn list_keys(
            &self,
            bucket: &str,
            prefix: &str,
            delimiter: Option<char>,
        ) -> io::Result<Listing> {
            let buckets = self.buckets.lock().expect("bucket lock");
            let objects = buckets.get(bucket).ok_or_else(|| not_found("no such bucket"))?;

            let mut listing = Listing::default();
            let mut grouped = BTreeSet::new();
            for key in objects.keys() {
                let Some(rest) = key.strip_prefix(prefix) else {
                    continue;
                };
                match delimiter.and_then(|d| rest.find(d)) {
                    Some(position) => {
                        grouped.insert(format!("{prefix}{}", &rest[..=position]));
                    }
                    None => listing.keys.push(key.clone()),
                }
            }
            listing.prefixes = grouped.into_iter().collect();
            Ok(listing)
        }
    }

    /// Wrapper failing the n-th ranged read, for aggregate-error tests.
    pub struct FlakyS3 {
        inner: Arc<dyn S3Client>,
        fail_read: usize,
        reads: AtomicUsize,
    }

    impl FlakyS3 {
        /// Fails the `fail_read`-th (1-based) call to `read_object_range`.
        pub fn new(inner: Arc<dyn S3Client>, fail_read: usize) -> FlakyS3 {
            FlakyS3 { inner, fail_read, reads: AtomicUsize::new(0) }
        }
    }

    impl S3Client for FlakyS3 {
        fn create_bucket(&self, bucket: &str) -> io::Result<()> {
            self.inner.create_bucket(bucket)
        }

        fn remove_bucket(&self, bucket: &str) -> io::Result<()> {
            self.inner.remove_bucket(bucket)
        }

        fn bucket_exists(&self, bucket: &str) -> io::Result<bool> {
            self.inner.bucket_exists(bucket)
        }

        fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> io::Result<()> {
            self.inner.put_object(bucket, key, body)
        }

        fn head_object(&self, bucket: &str, key: &str) -> io::Result<Option<u64>> {
            self.inner.head_object(bucket, key)
        }

        fn read_object_range(
            &self,
            bucket: &str,
            key: &str,
            offset: u64,
            buf: &mut [u8],
        ) -> io::Result<()> {
            let call = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if call == self.fail_read {
                return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
            }
            self.inner.read_object_range(bucket, key, offset, buf)
        }

        fn delete_object(&self, bucket: &str, key: &str) -> io::Result<()> {
            self.inner.delete_object(bucket, key)
        }

        fn copy_object(
            &self,
            src_bucket: &str,
            src_key: &str,
            dst_bucket: &str,
            dst_key: &str,
        ) -> io::Result<()> {
            self.inner.copy_object(src_bucket, src_key, dst_bucket, dst_key)
        }

        fn list_keys(
            &self,
            bucket: &str,
            prefix: &str,
            delimiter: Option<char>,
        ) -> io::Result<Listing> {
            self.inner.list_keys(bucket, prefix, delimiter)
        }
    }
}

#[cfg(feature = "hdfs")]
mod hdfs {
    use std::collections::BTreeMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    use crate::backend::hdfs::{HdfsClient, HdfsConnector, HdfsStat};
    use crate::config::HdfsParams;

    use super::{already_exists, not_found};

    /// Connector handing out one pre-built client, ignoring the
    /// connection parameters.
    pub struct StaticHdfsConnector(pub Arc<dyn HdfsClient>);

    impl HdfsConnector for StaticHdfsConnector {
        fn connect(&self, _params: &HdfsParams) -> io::Result<Arc<dyn HdfsClient>> {
            Ok(self.0.clone())
        }
    }

    enum Node {
        Dir,
        File(Vec<u8>),
    }

    /// A name-node namespace held entirely in memory.
    pub struct MemHdfs {
        nodes: Mutex<BTreeMap<String, Node>>,
    }

    impl Default for MemHdfs {
        fn default() -> Self {
            let mut nodes = BTreeMap::new();
            nodes.insert("/".to_string(), Node::Dir);
            MemHdfs { nodes: Mutex::new(nodes) }
        }
    }

    impl MemHdfs {
        pub fn new() -> MemHdfs {
            MemHdfs::default()
        }
    }

    fn normalize(path: &str) -> String {
        if path.len() > 1 {
            path.trim_end_matches('/').to_string()
        } else {
            path.to_string()
        }
    }

    fn parent_of(path: &str) -> Option<String> {
        let trimmed = path.trim_end_matches('/');
        trimmed.rfind('/').map(|idx| if idx == 0 { "/".into() } else { trimmed[..idx].into() })
    }

    fn insert_parents(nodes: &mut BTreeMap<String, Node>, path: &str) {
        let mut current = parent_of(path);
        while let Some(dir) = current {
            if nodes.contains_key(&dir) {
                break;
            }
            current = parent_of(&dir);
            nodes.insert(dir, Node::Dir);
        }
    }

    impl HdfsClient for MemHdfs {
        fn create_dir(&self, path: &str) -> io::Result<()> {
            let path = normalize(path);
            let mut nodes = self.nodes.lock().expect("namespace lock");
            match nodes.get(&path) {
                Some(Node::File(_)) => Err(already_exists("file in the way")),
                Some(Node::Dir) => Ok(()),
                None => {
                    insert_parents(&mut nodes, &path);
                    nodes.insert(path, Node::Dir);
                    Ok(())
                }
            }
        }

        fn remove_dir_all(&self, path: &str) -> io::Result<()> {
            let path = normalize(path);
            let mut nodes = self.nodes.lock().expect("namespace lock");
            if !matches!(nodes.get(&path), Some(Node::Dir)) {
                return Err(not_found("no such directory"));
            }
            let subtree = format!("{path}/");
            nodes.retain(|key, _| key != &path && !key.starts_with(&subtree));
            Ok(())
        }

        fn create_empty(&self, path: &str) -> io::Result<()> {
            let path = normalize(path);
            let mut nodes = self.nodes.lock().expect("namespace lock");
            if nodes.contains_key(&path) {
                return Err(already_exists("path exists"));
            }
            insert_parents(&mut nodes, &path);
            nodes.insert(path, Node::File(Vec::new()));
            Ok(())
        }

        fn remove_file(&self, path: &str) -> io::Result<()> {
            let path = normalize(path);
            let mut nodes = self.nodes.lock().expect("namespace lock");
            match nodes.get(&path) {
                Some(Node::File(_)) => {
                    nodes.remove(&path);
                    Ok(())
                }
                Some(Node::Dir) => {
                    Err(io::Error::new(io::ErrorKind::InvalidInput, "is a directory"))
                }
                None => Err(not_found("no such file")),
            }
        }

        fn stat(&self, path: &str) -> io::Result<Option<HdfsStat>> {
            let path = normalize(path);
            let nodes = self.nodes.lock().expect("namespace lock");
            Ok(nodes.get(&path).map(|node| match node {
                Node::Dir => HdfsStat { is_dir: true, len: 0 },
                Node::File(body) => HdfsStat { is_dir: false, len: body.len() as u64 },
            }))
        }

        fn list_dir(&self, path: &str) -> io::Result<Vec<String>> {
            let path = normalize(path);
            let nodes = self.nodes.lock().expect("namespace lock");
            if !matches!(nodes.get(&path), Some(Node::Dir)) {
                return Err(not_found("no such directory"));
            }
            let prefix = if path == "/" { "/".to_string() } else { format!("{path}/") };
            Ok(nodes
                .keys()
                .filter(|key| {
                    key.strip_prefix(&prefix)
                        .map(|rest| !rest.is_empty() && !rest.contains('/'))
                        .unwrap_or(false)
                })
                .cloned()
                .collect())
        }

        fn read_at(&self, path: &str, offset: u64, buf: &mut [u8]) -> io::Result<()> {
            let path = normalize(path);
            let nodes = self.nodes.lock().expect("namespace lock");
            let Some(Node::File(body)) = nodes.get(&path) else {
                return Err(not_found("no such file"));
            };
            let offset = offset as usize;
            if offset + buf.len() > body.len() {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "range past end"));
            }
            buf.copy_from_slice(&body[offset..offset + buf.len()]);
            Ok(())
        }

        fn append(&self, path: &str, data: &[u8]) -> io::Result<()> {
            let path = normalize(path);
            let mut nodes = self.nodes.lock().expect("namespace lock");
            match nodes.get_mut(&path) {
                Some(Node::File(body)) => {
                    body.extend_from_slice(data);
                    Ok(())
                }
                Some(Node::Dir) => {
                    Err(io::Error::new(io::ErrorKind::InvalidInput, "is a directory"))
                }
                None => {
                    insert_parents(&mut nodes, &path);
                    nodes.insert(path, Node::File(data.to_vec()));
                    Ok(())
                }
            }
        }

        fn rename(&self, from: &str, to: &str) -> io::Result<()> {
            let from = normalize(from);
            let to = normalize(to);
            let mut nodes = self.nodes.lock().expect("namespace lock");
            if !nodes.contains_key(&from) {
                return Err(not_found("no such path"));
            }
            if nodes.contains_key(&to) {
                return Err(already_exists("destination exists"));
            }

            let moved: Vec<(String, String)> = nodes
                .keys()
                .filter(|key| *key == &from || key.starts_with(&format!("{from}/")))
                .map(|key| (key.clone(), format!("{to}{}", &key[from.len()..])))
                .collect();
            insert_parents(&mut nodes, &to);
            for (old, new) in moved {
                if let Some(node) = nodes.remove(&old) {
                    nodes.insert(new, node);
                }
            }
            Ok(())
        }

        fn flush(&self, path: &str) -> io::Result<()> {
            let path = normalize(path);
            let nodes = self.nodes.lock().expect("namespace lock");
            match nodes.get(&path) {
                Some(_) => Ok(()),
                None => Err(not_found("no such file")),
            }
        }
    }
}
