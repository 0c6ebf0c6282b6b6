//! Recognized configuration options.
//!
//! The storage layer above hands configuration through as TOML; every
//! field is optional and falls back to a default, but unknown keys are
//! rejected so that typos surface at `init` rather than as silently
//! ignored tuning.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VfsError};

/// Configuration of a [`crate::Vfs`] instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VfsParams {
    /// Size of the worker pool serving parallel fan-out. Must be at least 1.
    pub max_parallel_ops: usize,
    /// Reads below this many bytes are served on the caller's thread.
    /// Must be at least 1.
    pub min_parallel_size: u64,
    /// Handed opaquely to the HDFS driver at connect time.
    pub hdfs: HdfsParams,
    /// Handed to the S3 driver at connect time.
    pub s3: S3Params,
}

impl Default for VfsParams {
    fn default() -> Self {
        Self {
            max_parallel_ops: default_max_parallel_ops(),
            min_parallel_size: 10 * 1024 * 1024,
            hdfs: HdfsParams::default(),
            s3: S3Params::default(),
        }
    }
}

impl VfsParams {
    /// Parses a TOML document of recognized options.
    pub fn from_toml(text: &str) -> Result<VfsParams> {
        let params: VfsParams =
            toml::from_str(text).map_err(|err| VfsError::InvalidConfig(err.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Rejects out-of-range values before they reach any backend.
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel_ops == 0 {
            return Err(VfsError::InvalidConfig("max_parallel_ops must be at least 1".into()));
        }
        if self.min_parallel_size == 0 {
            return Err(VfsError::InvalidConfig("min_parallel_size must be at least 1".into()));
        }
        Ok(())
    }
}

fn default_max_parallel_ops() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// HDFS connection settings. The VFS does not interpret these; they are
/// passed through to the driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HdfsParams {
    /// Name-node URI, e.g. `hdfs://namenode:9000` or `default`.
    pub name_node: Option<String>,
    /// User to connect as.
    pub username: Option<String>,
    /// Path of the Kerberos ticket cache, when Kerberos is in play.
    pub kerberos_ticket_cache: Option<String>,
}

/// S3 connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct S3Params {
    pub region: String,
    /// Protocol used to reach the endpoint.
    pub scheme: HttpScheme,
    /// Overrides the region-derived endpoint; this is how non-AWS
    /// S3-compatible stores are addressed.
    pub endpoint_override: Option<String>,
    /// `bucket.host` addressing instead of `host/bucket`.
    pub use_virtual_addressing: bool,
    /// Write-buffer size the driver uses per object upload.
    pub file_buffer_size: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for S3Params {
    fn default() -> Self {
        Self {
            region: "us-east-1".into(),
            scheme: HttpScheme::Https,
            endpoint_override: None,
            use_virtual_addressing: true,
            file_buffer_size: 5 * 1024 * 1024,
            connect_timeout_ms: 3_000,
            request_timeout_ms: 30_000,
        }
    }
}

/// Protocol for reaching an S3 endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpScheme {
    Http,
    Https,
}
