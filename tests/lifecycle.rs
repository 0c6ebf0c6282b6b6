//! Initialization, shutdown, capability queries and dispatch errors.

mod common;

use common::{ready_vfs, small_params, vfs};
use unifs::{BackendKind, Uri, VfsError};

#[test]
fn operations_require_init() {
    let uninitialized = vfs();
    let uri = Uri::new("file:///tmp/x");
    assert!(matches!(
        uninitialized.touch(&uri),
        Err(VfsError::NotInitialized { op: "touch", .. })
    ));
    assert!(matches!(uninitialized.ls(&uri), Err(VfsError::NotInitialized { op: "ls", .. })));
}

#[test]
fn shutdown_returns_to_uninitialized() {
    let mut vfs = ready_vfs();
    assert!(vfs.config().is_some());

    vfs.shutdown();
    assert!(vfs.config().is_none());
    assert!(matches!(
        vfs.touch(&Uri::new("file:///tmp/x")),
        Err(VfsError::NotInitialized { .. })
    ));
}

#[test]
fn config_snapshot_reflects_init_params() {
    let vfs = ready_vfs();
    let params = vfs.config().unwrap();
    assert_eq!(params.max_parallel_ops, 4);
    assert_eq!(params.min_parallel_size, 1024);
}

#[test]
fn init_twice_is_rejected() {
    let mut vfs = ready_vfs();
    assert!(matches!(vfs.init(small_params()), Err(VfsError::InvalidConfig(_))));
}

#[test]
fn invalid_params_leave_the_vfs_uninitialized() {
    let mut target = vfs();
    let mut params = small_params();
    params.max_parallel_ops = 0;

    assert!(matches!(target.init(params), Err(VfsError::InvalidConfig(_))));
    assert!(target.config().is_none());
}

#[test]
fn local_backend_is_always_supported() {
    let vfs = vfs();
    let local = if cfg!(windows) { BackendKind::Win } else { BackendKind::Posix };
    assert!(vfs.supports_fs(local));
}

#[test]
fn unknown_schemes_are_rejected_without_side_effects() {
    let vfs = ready_vfs();
    let uri = Uri::new("gopher://hole/x");
    assert!(matches!(vfs.touch(&uri), Err(VfsError::UnsupportedScheme { .. })));
    assert!(matches!(vfs.ls(&uri), Err(VfsError::UnsupportedScheme { .. })));
    assert!(matches!(vfs.is_dir(&uri), Err(VfsError::UnsupportedScheme { .. })));
}

#[cfg(any(feature = "hdfs", feature = "s3"))]
#[test]
fn init_without_drivers_fails() {
    let mut bare = unifs::Vfs::new();
    let err = bare.init(small_params()).unwrap_err();
    assert!(matches!(err, VfsError::Backend { op: "init", .. }));
    assert!(bare.config().is_none());
}

#[cfg(feature = "s3")]
#[test]
fn s3_support_is_advertised() {
    assert!(vfs().supports_fs(BackendKind::S3));
}

#[cfg(not(feature = "s3"))]
mod without_s3 {
    use super::*;

    #[test]
    fn s3_operations_report_feature_not_built() {
        let vfs = ready_vfs();
        assert!(!vfs.supports_fs(BackendKind::S3));

        let uri = Uri::new("s3://bucket/x");
        assert!(matches!(
            vfs.create_bucket(&uri),
            Err(VfsError::FeatureNotBuilt { backend: BackendKind::S3, .. })
        ));
        assert!(matches!(
            vfs.touch(&uri),
            Err(VfsError::FeatureNotBuilt { backend: BackendKind::S3, .. })
        ));
    }
}

#[cfg(not(feature = "hdfs"))]
mod without_hdfs {
    use super::*;

    #[test]
    fn hdfs_operations_report_feature_not_built() {
        let vfs = ready_vfs();
        assert!(!vfs.supports_fs(BackendKind::Hdfs));
        assert!(matches!(
            vfs.touch(&Uri::new("hdfs://nn/x")),
            Err(VfsError::FeatureNotBuilt { backend: BackendKind::Hdfs, .. })
        ));
    }
}
