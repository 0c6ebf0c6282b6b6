//! S3 adapter.
//!
//! Object stores have no directories, no rename and no append. This
//! adapter emulates what the façade needs: directories are key prefixes,
//! moves are copy-then-delete, and writes accumulate in a per-URI buffer
//! that is committed as one object when the file is closed.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use crate::config::S3Params;
use crate::error::{Result, VfsError};
use crate::uri::Uri;

use super::Backend;

/// One page of a prefix listing, split the way S3's ListObjectsV2 splits
/// it: exact keys below the prefix and, when a delimiter is given, the
/// "directories" grouped behind it.
#[derive(Debug, Default, Clone)]
pub struct Listing {
    pub keys: Vec<String>,
    pub prefixes: Vec<String>,
}

/// Low-level S3 driver interface.
///
/// Implementations wrap an actual S3 SDK (or an in-memory double) and are
/// shared across the worker pool.
pub trait S3Client: Send + Sync {
    fn create_bucket(&self, bucket: &str) -> io::Result<()>;

    /// Removes an empty bucket.
    fn remove_bucket(&self, bucket: &str) -> io::Result<()>;

    fn bucket_exists(&self, bucket: &str) -> io::Result<bool>;

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> io::Result<()>;

    /// Size of the exact-keyed object, or `None` when no such key exists.
    fn head_object(&self, bucket: &str, key: &str) -> io::Result<Option<u64>>;

    /// Fills `buf` from the object starting at `offset` (a ranged GET).
    fn read_object_range(
        &self,
        bucket: &str,
        key: &str,
        offset: u64,
        buf: &mut [u8],
    ) -> io::Result<()>;

    fn delete_object(&self, bucket: &str, key: &str) -> io::Result<()>;

    fn copy_object(
        &self,
        src_bucket: &str,
        src_key: &str,
        dst_bucket: &str,
        dst_key: &str,
    ) -> io::Result<()>;

    /// Keys under `prefix`. With a delimiter, keys containing it past the
    /// prefix are folded into [`Listing::prefixes`].
    fn list_keys(&self, bucket: &str, prefix: &str, delimiter: Option<char>)
        -> io::Result<Listing>;
}

/// Builds an [`S3Client`] from connection parameters at `init` time.
pub trait S3Connector: Send + Sync {
    fn connect(&self, params: &S3Params) -> io::Result<Arc<dyn S3Client>>;
}

pub struct S3Backend {
    client: Arc<dyn S3Client>,
    /// Pending writes, keyed by full URI, committed on close.
    write_buffers: Mutex<HashMap<String, Vec<u8>>>,
    file_buffer_size: usize,
}

/// `s3://bucket/key` split, or an error for URIs without a bucket.
fn bucket_and_key<'a>(op: &'static str, uri: &'a Uri) -> Result<(&'a str, &'a str)> {
    match (uri.bucket(), uri.key()) {
        (Some(bucket), Some(key)) if !bucket.is_empty() => Ok((bucket, key)),
        _ => Err(VfsError::unsupported(op, uri)),
    }
}

/// The listing prefix that treats `key` as a directory.
fn dir_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_string()
    } else {
        format!("{key}/")
    }
}

impl S3Backend {
    pub fn new(client: Arc<dyn S3Client>, params: &S3Params) -> S3Backend {
        S3Backend {
            client,
            write_buffers: Mutex::new(HashMap::new()),
            file_buffer_size: params.file_buffer_size as usize,
        }
    }

    pub fn create_bucket(&self, uri: &Uri) -> Result<()> {
        let bucket = self.bucket_of("create_bucket", uri)?;
        self.client
            .create_bucket(bucket)
            .map_err(|err| VfsError::from_io("create_bucket", uri, err))
    }

    pub fn remove_bucket(&self, uri: &Uri) -> Result<()> {
        let bucket = self.bucket_of("remove_bucket", uri)?;
        self.client
            .remove_bucket(bucket)
            .map_err(|err| VfsError::from_io("remove_bucket", uri, err))
    }

    pub fn is_bucket(&self, uri: &Uri) -> Result<bool> {
        let bucket = self.bucket_of("is_bucket", uri)?;
        self.client.bucket_exists(bucket).map_err(|err| VfsError::from_io("is_bucket", uri, err))
    }

    /// Deletes every object in the bucket, leaving the bucket itself.
    pub fn empty_bucket(&self, uri: &Uri) -> Result<()> {
        let bucket = self.bucket_of("empty_bucket", uri)?;
        let listing = self
            .client
            .list_keys(bucket, "", None)
            .map_err(|err| VfsError::from_io("empty_bucket", uri, err))?;
        for key in &listing.keys {
            self.client
                .delete_object(bucket, key)
                .map_err(|err| VfsError::from_io("empty_bucket", uri, err))?;
        }
        Ok(())
    }

    pub fn is_empty_bucket(&self, uri: &Uri) -> Result<bool> {
        let bucket = self.bucket_of("is_empty_bucket", uri)?;
        if !self
            .client
            .bucket_exists(bucket)
            .map_err(|err| VfsError::from_io("is_empty_bucket", uri, err))?
        {
            return Err(VfsError::not_found("is_empty_bucket", uri));
        }
        let listing = self
            .client
            .list_keys(bucket, "", None)
            .map_err(|err| VfsError::from_io("is_empty_bucket", uri, err))?;
        Ok(listing.keys.is_empty())
    }

    /// Renames every object under the `old` prefix to the `new` prefix,
    /// copy-then-delete per object.
    pub fn move_dir(&self, old: &Uri, new: &Uri) -> Result<()> {
        let (old_bucket, old_key) = bucket_and_key("move_dir", old)?;
        let (new_bucket, new_key) = bucket_and_key("move_dir", new)?;
        let old_prefix = dir_prefix(old_key);
        let new_prefix = dir_prefix(new_key);

        let listing = self
            .client
            .list_keys(old_bucket, &old_prefix, None)
            .map_err(|err| VfsError::from_io("move_dir", old, err))?;
        if listing.keys.is_empty() {
            return Err(VfsError::not_found("move_dir", old));
        }

        for key in &listing.keys {
            let suffix = &key[old_prefix.len()..];
            let target = format!("{new_prefix}{suffix}");
            self.client
                .copy_object(old_bucket, key, new_bucket, &target)
                .map_err(|err| VfsError::from_io("move_dir", old, err))?;
            self.client
                .delete_object(old_bucket, key)
                .map_err(|err| VfsError::from_io("move_dir", old, err))?;
        }
        Ok(())
    }

    fn bucket_of<'a>(&self, op: &'static str, uri: &'a Uri) -> Result<&'a str> {
        match uri.bucket() {
            Some(bucket) if !bucket.is_empty() => Ok(bucket),
            _ => Err(VfsError::unsupported(op, uri)),
        }
    }
}

impl Backend for S3Backend {
    fn create_dir(&self, _uri: &Uri) -> Result<()> {
        // Object stores have no directories to create.
        Ok(())
    }

    fn touch(&self, uri: &Uri) -> Result<()> {
        let (bucket, key) = bucket_and_key("touch", uri)?;
        let existing = self
            .client
            .head_object(bucket, key)
            .map_err(|err| VfsError::from_io("touch", uri, err))?;
        if existing.is_some() {
            // Overwriting with a zero-length object would clobber data.
            return Ok(());
        }
        self.client.put_object(bucket, key, &[]).map_err(|err| VfsError::from_io("touch", uri, err))
    }

    fn remove_dir(&self, uri: &Uri) -> Result<()> {
        let (bucket, key) = bucket_and_key("remove_dir", uri)?;
        let prefix = dir_prefix(key);
        let listing = self
            .client
            .list_keys(bucket, &prefix, None)
            .map_err(|err| VfsError::from_io("remove_dir", uri, err))?;
        if listing.keys.is_empty() {
            return Err(VfsError::not_found("remove_dir", uri));
        }
        for key in &listing.keys {
            self.client
                .delete_object(bucket, key)
                .map_err(|err| VfsError::from_io("remove_dir", uri, err))?;
        }
        Ok(())
    }

    fn remove_file(&self, uri: &Uri) -> Result<()> {
        let (bucket, key) = bucket_and_key("remove_file", uri)?;
        let existing = self
            .client
            .head_object(bucket, key)
            .map_err(|err| VfsError::from_io("remove_file", uri, err))?;
        if existing.is_none() {
            return Err(VfsError::not_found("remove_file", uri));
        }
        self.client
            .delete_object(bucket, key)
            .map_err(|err| VfsError::from_io("remove_file", uri, err))
    }

    fn ls(&self, uri: &Uri) -> Result<Vec<Uri>> {
        let (bucket, key) = bucket_and_key("ls", uri)?;
        let prefix = dir_prefix(key);
        let listing = self
            .client
            .list_keys(bucket, &prefix, Some('/'))
            .map_err(|err| VfsError::from_io("ls", uri, err))?;

        let mut children = Vec::with_capacity(listing.keys.len() + listing.prefixes.len());
        for key in listing.keys {
            children.push(Uri::new(format!("s3://{bucket}/{key}")));
        }
        for prefix in listing.prefixes {
            let dir = prefix.trim_end_matches('/');
            children.push(Uri::new(format!("s3://{bucket}/{dir}")));
        }
        Ok(children)
    }

    fn file_size(&self, uri: &Uri) -> Result<u64> {
        let (bucket, key) = bucket_and_key("file_size", uri)?;
        match self
            .client
            .head_object(bucket, key)
            .map_err(|err| VfsError::from_io("file_size", uri, err))?
        {
            Some(len) => Ok(len),
            None => Err(VfsError::not_found("file_size", uri)),
        }
    }

    fn is_dir(&self, uri: &Uri) -> Result<bool> {
        let (bucket, key) = bucket_and_key("is_dir", uri)?;
        if key.is_empty() {
            return self
                .client
                .bucket_exists(bucket)
                .map_err(|err| VfsError::from_io("is_dir", uri, err));
        }
        let prefix = dir_prefix(key);
        let listing = self
            .client
            .list_keys(bucket, &prefix, Some('/'))
            .map_err(|err| VfsError::from_io("is_dir", uri, err))?;
        Ok(!listing.keys.is_empty() || !listing.prefixes.is_empty())
    }

    fn is_file(&self, uri: &Uri) -> Result<bool> {
        let (bucket, key) = bucket_and_key("is_file", uri)?;
        Ok(self
            .client
            .head_object(bucket, key)
            .map_err(|err| VfsError::from_io("is_file", uri, err))?
            .is_some())
    }

    fn read(&self, uri: &Uri, offset: u64, buf: &mut [u8]) -> Result<()> {
        let (bucket, key) = bucket_and_key("read", uri)?;
        self.client
            .read_object_range(bucket, key, offset, buf)
            .map_err(|err| VfsError::from_io("read", uri, err))
    }

    fn write(&self, uri: &Uri, buf: &[u8]) -> Result<()> {
        let mut buffers = self.write_buffers.lock().expect("write buffer lock");
        let buffer = buffers
            .entry(uri.to_string())
            .or_insert_with(|| Vec::with_capacity(self.file_buffer_size.min(buf.len())));
        buffer.extend_from_slice(buf);
        Ok(())
    }

    fn sync(&self, uri: &Uri) -> Result<()> {
        // Buffered data is committed on close; nothing to flush here.
        let _ = uri;
        Ok(())
    }

    fn move_path(&self, old: &Uri, new: &Uri) -> Result<()> {
        let (old_bucket, old_key) = bucket_and_key("move", old)?;
        let (new_bucket, new_key) = bucket_and_key("move", new)?;

        let existing = self
            .client
            .head_object(old_bucket, old_key)
            .map_err(|err| VfsError::from_io("move", old, err))?;
        if existing.is_none() {
            return Err(VfsError::not_found("move", old));
        }

        self.client
            .copy_object(old_bucket, old_key, new_bucket, new_key)
            .map_err(|err| VfsError::from_io("move", old, err))?;
        self.client
            .delete_object(old_bucket, old_key)
            .map_err(|err| VfsError::from_io("move", old, err))
    }

    fn close(&self, uri: &Uri) -> Result<()> {
        let pending = self.write_buffers.lock().expect("write buffer lock").remove(uri.as_str());
        match pending {
            Some(body) => {
                let (bucket, key) = bucket_and_key("close_file", uri)?;
                self.client
                    .put_object(bucket, key, &body)
                    .map_err(|err| VfsError::from_io("close_file", uri, err))
            }
            None => Ok(()),
        }
    }
}
