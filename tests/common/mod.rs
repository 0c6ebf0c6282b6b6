//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use unifs::{Drivers, Uri, Vfs, VfsParams};

#[cfg(any(feature = "hdfs", feature = "s3"))]
use std::sync::Arc;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Small parallelism thresholds so tests exercise fan-out with tiny data.
pub fn small_params() -> VfsParams {
    let mut params = VfsParams::default();
    params.max_parallel_ops = 4;
    params.min_parallel_size = 1024;
    params
}

/// A VFS wired to in-memory drivers for every compiled remote backend.
pub fn vfs() -> Vfs {
    let drivers = Drivers {
        #[cfg(feature = "hdfs")]
        hdfs: Some(Box::new(unifs::testing::StaticHdfsConnector(Arc::new(
            unifs::testing::MemHdfs::new(),
        )))),
        #[cfg(feature = "s3")]
        s3: Some(Box::new(unifs::testing::StaticS3Connector(Arc::new(
            unifs::testing::MemS3::new(),
        )))),
    };
    Vfs::with_drivers(drivers)
}

/// [`vfs`], already initialized with [`small_params`].
pub fn ready_vfs() -> Vfs {
    init_tracing();
    let mut vfs = vfs();
    vfs.init(small_params()).unwrap();
    vfs
}

/// A VFS whose S3 backend is served by the given client.
#[cfg(feature = "s3")]
pub fn vfs_with_s3(client: Arc<dyn unifs::S3Client>) -> Vfs {
    let drivers = Drivers {
        #[cfg(feature = "hdfs")]
        hdfs: Some(Box::new(unifs::testing::StaticHdfsConnector(Arc::new(
            unifs::testing::MemHdfs::new(),
        )))),
        s3: Some(Box::new(unifs::testing::StaticS3Connector(client))),
    };
    init_tracing();
    let mut vfs = Vfs::with_drivers(drivers);
    vfs.init(small_params()).unwrap();
    vfs
}

/// Reads the whole entry through `file_size` + `read`.
pub fn read_all(vfs: &Vfs, uri: &Uri) -> Vec<u8> {
    let size = vfs.file_size(uri).unwrap() as usize;
    let mut buf = vec![0u8; size];
    vfs.read(uri, 0, &mut buf).unwrap();
    buf
}

/// Deterministic byte pattern for read/write round trips.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|index| (index % 251) as u8).collect()
}
