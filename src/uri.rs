//! URI value type used to address entries across storage backends.

use std::fmt;

/// Storage scheme a [`Uri`] belongs to.
///
/// The scheme is decided once, when the URI is constructed, and never
/// changes afterwards.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scheme {
    /// Local disk, `file://`.
    File,
    /// Hadoop Distributed File System, `hdfs://`.
    Hdfs,
    /// S3-compatible object store, `s3://`.
    S3,
    /// Any scheme this crate does not recognize.
    Other,
}

/// An address on some storage backend.
///
/// A `Uri` is a pure value: constructing one performs no I/O and the
/// backends never mutate it. Ordering is byte-wise on the full URI string,
/// which makes listings deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Uri {
    raw: String,
    scheme: Scheme,
}

impl Uri {
    /// Builds a URI from a string.
    ///
    /// Strings without a `scheme://` prefix are taken to be local paths and
    /// gain a `file://` prefix; strings with an unrecognized scheme keep
    /// their text but classify as [`Scheme::Other`].
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();

        for (prefix, scheme) in
            [("file://", Scheme::File), ("hdfs://", Scheme::Hdfs), ("s3://", Scheme::S3)]
        {
            if s.starts_with(prefix) {
                return Self { raw: s, scheme };
            }
        }

        if s.contains("://") {
            Self { raw: s, scheme: Scheme::Other }
        } else {
            Self { raw: format!("file://{s}"), scheme: Scheme::File }
        }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn is_file(&self) -> bool {
        self.scheme == Scheme::File
    }

    pub fn is_hdfs(&self) -> bool {
        self.scheme == Scheme::Hdfs
    }

    pub fn is_s3(&self) -> bool {
        self.scheme == Scheme::S3
    }

    /// The full URI string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Everything after the `scheme://` prefix.
    ///
    /// For `file://` URIs this is the host path. Unrecognized schemes are
    /// returned unchanged.
    pub fn to_path(&self) -> &str {
        match self.raw.find("://") {
            Some(idx) if self.scheme != Scheme::Other => &self.raw[idx + 3..],
            _ => &self.raw,
        }
    }

    /// The authority component: the name node for `hdfs://`, the bucket for
    /// `s3://`. Local URIs have none.
    pub fn authority(&self) -> Option<&str> {
        match self.scheme {
            Scheme::Hdfs | Scheme::S3 => {
                let rest = self.to_path();
                Some(rest.split('/').next().unwrap_or(rest))
            }
            _ => None,
        }
    }

    /// The path component after the authority.
    ///
    /// `hdfs://nn:9000/a/b` gives `/a/b`; for local URIs this equals
    /// [`Uri::to_path`].
    pub fn path(&self) -> &str {
        match self.scheme {
            Scheme::Hdfs | Scheme::S3 => {
                let rest = self.to_path();
                match rest.find('/') {
                    Some(idx) => &rest[idx..],
                    None => "",
                }
            }
            _ => self.to_path(),
        }
    }

    /// The bucket of an `s3://` URI, if this is one.
    pub fn bucket(&self) -> Option<&str> {
        if self.is_s3() {
            self.authority()
        } else {
            None
        }
    }

    /// The object key of an `s3://` URI: the path with its leading slash
    /// stripped. The bucket root has an empty key.
    pub fn key(&self) -> Option<&str> {
        if self.is_s3() {
            Some(self.path().trim_start_matches('/'))
        } else {
            None
        }
    }

    /// Appends one path segment, inserting a separator when needed.
    pub fn join(&self, segment: &str) -> Uri {
        let mut raw = self.raw.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        raw.push_str(segment.trim_start_matches('/'));
        Uri { raw, scheme: self.scheme }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Uri {
    fn from(s: &str) -> Self {
        Uri::new(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scheme_classification() {
        assert_eq!(Uri::new("file:///tmp/x").scheme(), Scheme::File);
        assert_eq!(Uri::new("hdfs://nn:9000/a").scheme(), Scheme::Hdfs);
        assert_eq!(Uri::new("s3://bucket/k").scheme(), Scheme::S3);
        assert_eq!(Uri::new("gopher://hole").scheme(), Scheme::Other);
    }

    #[test]
    fn bare_path_becomes_file() {
        let uri = Uri::new("/tmp/data");
        assert!(uri.is_file());
        assert_eq!(uri.as_str(), "file:///tmp/data");
        assert_eq!(uri.to_path(), "/tmp/data");
    }

    #[test]
    fn s3_bucket_and_key() {
        let uri = Uri::new("s3://bucket/a/b");
        assert_eq!(uri.bucket(), Some("bucket"));
        assert_eq!(uri.key(), Some("a/b"));

        let root = Uri::new("s3://bucket");
        assert_eq!(root.bucket(), Some("bucket"));
        assert_eq!(root.key(), Some(""));
    }

    #[test]
    fn hdfs_authority_and_path() {
        let uri = Uri::new("hdfs://nn:9000/a/b");
        assert_eq!(uri.authority(), Some("nn:9000"));
        assert_eq!(uri.path(), "/a/b");

        let no_authority = Uri::new("hdfs:///a/b");
        assert_eq!(no_authority.authority(), Some(""));
        assert_eq!(no_authority.path(), "/a/b");
    }

    #[test]
    fn join_inserts_separator() {
        assert_eq!(Uri::new("s3://b/a").join("k").as_str(), "s3://b/a/k");
        assert_eq!(Uri::new("s3://b/a/").join("k").as_str(), "s3://b/a/k");
    }

    #[test]
    fn ordering_is_bytewise() {
        let mut uris =
            vec![Uri::new("file:///b"), Uri::new("file:///a"), Uri::new("file:///a/c")];
        uris.sort();
        assert_eq!(
            uris.iter().map(Uri::as_str).collect::<Vec<_>>(),
            vec!["file:///a", "file:///a/c", "file:///b"]
        );
    }
}
