//! Error taxonomy shared by every virtual file system operation.

use std::io;

use crate::capability::BackendKind;
use crate::uri::Uri;

/// Result of virtual file system operations.
pub type Result<T> = std::result::Result<T, VfsError>;

/// Failure of a virtual file system operation.
///
/// Every variant carries enough context to name the operation and the URI
/// it was applied to. Errors are returned, never thrown; callers match on
/// the variant rather than on message text.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// The URI's scheme is not one this crate recognizes, or the operation
    /// is not defined for the scheme (for example, bucket operations on a
    /// local path).
    #[error("{op}: unsupported URI scheme: {uri}")]
    UnsupportedScheme { op: &'static str, uri: String },

    /// The scheme is recognized but its backend was not compiled into this
    /// build.
    #[error("{op}: {backend} support is not compiled into this build: {uri}")]
    FeatureNotBuilt { op: &'static str, backend: BackendKind, uri: String },

    /// The operation was called before `init` or after `shutdown`.
    #[error("{op}: virtual file system is not initialized: {uri}")]
    NotInitialized { op: &'static str, uri: String },

    /// The target entry does not exist.
    #[error("{op}: no such entry: {uri}")]
    NotFound { op: &'static str, uri: String },

    /// The target entry already exists.
    #[error("{op}: entry already exists: {uri}")]
    AlreadyExists { op: &'static str, uri: String },

    /// A move was attempted between two different schemes.
    #[error("move: source and destination schemes differ: {from} -> {to}")]
    CrossSchemeUnsupported { from: String, to: String },

    /// `open_file` in append mode on an object store.
    #[error("open_file: append is not supported on object stores: {uri}")]
    AppendUnsupported { uri: String },

    /// The backend driver reported a failure.
    #[error("{op}: {uri}: {source}")]
    Backend {
        op: &'static str,
        uri: String,
        #[source]
        source: io::Error,
    },

    /// One or more sub-range reads of a parallel read failed. The message
    /// preserves the first underlying failure.
    #[error("parallel read error: {uri}: {message}")]
    ParallelRead { uri: String, message: String },

    /// Rejected configuration, reported by `init` before any side effect.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl VfsError {
    /// Classifies a driver-level `io::Error` for `op` applied to `uri`.
    ///
    /// Missing and pre-existing entries keep their identity; everything
    /// else is a backend failure carrying the driver error as its cause.
    pub fn from_io(op: &'static str, uri: &Uri, err: io::Error) -> VfsError {
        match err.kind() {
            io::ErrorKind::NotFound => VfsError::NotFound { op, uri: uri.to_string() },
            io::ErrorKind::AlreadyExists => {
                VfsError::AlreadyExists { op, uri: uri.to_string() }
            }
            _ => VfsError::Backend { op, uri: uri.to_string(), source: err },
        }
    }

    pub(crate) fn not_initialized(op: &'static str, uri: &Uri) -> VfsError {
        VfsError::NotInitialized { op, uri: uri.to_string() }
    }

    pub(crate) fn not_found(op: &'static str, uri: &Uri) -> VfsError {
        VfsError::NotFound { op, uri: uri.to_string() }
    }

    pub(crate) fn unsupported(op: &'static str, uri: &Uri) -> VfsError {
        VfsError::UnsupportedScheme { op, uri: uri.to_string() }
    }

    #[allow(dead_code)] // referenced only by feature-gated dispatch arms
    pub(crate) fn not_built(op: &'static str, backend: BackendKind, uri: &Uri) -> VfsError {
        VfsError::FeatureNotBuilt { op, backend, uri: uri.to_string() }
    }
}
