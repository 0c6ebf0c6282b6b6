//! unifs - a unified virtual file system over local disk, HDFS and S3.
//!
//! One URI-addressed façade, [`Vfs`], routes every operation to the
//! backend its scheme names, hiding how different those backends really
//! are: object stores have no directories, no rename and no append, so
//! the S3 adapter emulates them; HDFS renames are metadata operations;
//! local disk gets advisory locks. Large reads are split into disjoint
//! sub-ranges and served concurrently by a bounded worker pool.

pub mod backend;
mod capability;
mod config;
mod error;
mod plan;
mod pool;
pub mod testing;
mod uri;
mod vfs;

pub use crate::capability::{BackendKind, SupportedSet};
pub use crate::config::{HdfsParams, HttpScheme, S3Params, VfsParams};
pub use crate::error::{Result, VfsError};
pub use crate::pool::{TaskHandle, ThreadPool};
pub use crate::uri::{Scheme, Uri};
pub use crate::vfs::{FileLock, Vfs, VfsMode};

pub use crate::backend::{Backend, Drivers};

#[cfg(feature = "hdfs")]
pub use crate::backend::hdfs::{HdfsClient, HdfsConnector, HdfsStat};
#[cfg(feature = "s3")]
pub use crate::backend::s3::{Listing, S3Client, S3Connector};
