//! What this build links and what each backend can serve.

use std::fmt;

/// One of the storage backends a build may carry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Posix,
    Win,
    Hdfs,
    S3,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Posix => "POSIX",
            BackendKind::Win => "Windows",
            BackendKind::Hdfs => "HDFS",
            BackendKind::S3 => "S3",
        })
    }
}

bitflags::bitflags! {
    /// Set of backends compiled into a build.
    ///
    /// Exactly one of `POSIX`/`WIN` is present depending on the host;
    /// `HDFS` and `S3` follow the cargo features of the same names.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct SupportedSet: u8 {
        const POSIX = 1 << 0;
        const WIN = 1 << 1;
        const HDFS = 1 << 2;
        const S3 = 1 << 3;
    }
}

impl SupportedSet {
    /// The set the current build was compiled with.
    pub fn for_build() -> SupportedSet {
        let mut set = if cfg!(windows) { SupportedSet::WIN } else { SupportedSet::POSIX };
        if cfg!(feature = "hdfs") {
            set |= SupportedSet::HDFS;
        }
        if cfg!(feature = "s3") {
            set |= SupportedSet::S3;
        }
        set
    }

    pub fn supports(&self, kind: BackendKind) -> bool {
        self.contains(match kind {
            BackendKind::Posix => SupportedSet::POSIX,
            BackendKind::Win => SupportedSet::WIN,
            BackendKind::Hdfs => SupportedSet::HDFS,
            BackendKind::S3 => SupportedSet::S3,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn build_set_has_exactly_one_local_backend() {
        let set = SupportedSet::for_build();
        assert!(set.supports(BackendKind::Posix) ^ set.supports(BackendKind::Win));
    }

    #[cfg(feature = "s3")]
    #[test]
    fn s3_feature_is_advertised() {
        assert!(SupportedSet::for_build().supports(BackendKind::S3));
    }

    #[cfg(not(feature = "s3"))]
    #[test]
    fn missing_s3_feature_is_not_advertised() {
        assert!(!SupportedSet::for_build().supports(BackendKind::S3));
    }
}
