//! Storage transport adapters.
//!
//! Submodules:
//! - `localfs`: directory-rooted mock backend for local tests
//! - `s3`: S3-compatible backend built on aws-sdk-s3
//!
//! The trait collapses open/write/close into a single completed call per
//! object: `put_object` returns only after the upload is finalized, and
//! `get_object` returns the whole body. Failures propagate to the caller;
//! reruns are the CI runner's job, not the transport's.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub mod localfs;
pub mod s3;

/// Named options forwarded opaquely to the transport. The verifier never
/// interprets them; a backend may (e.g. the S3 backend maps
/// [`SERVER_SIDE_ENCRYPTION`] onto the upload request).
pub type TransportOptions = HashMap<String, String>;

/// Option key requesting a server-side-encryption algorithm.
pub const SERVER_SIDE_ENCRYPTION: &str = "ServerSideEncryption";

#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Write the full payload under `key`. The object is finalized when this
    /// returns; there is no separate close step.
    async fn put_object(&self, key: &str, data: &[u8], options: &TransportOptions) -> Result<()>;

    /// Read the entire object, or `None` when nothing exists at `key`.
    async fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete every object whose key starts with `prefix`. An empty prefix
    /// space is not an error, so deletion is idempotent.
    async fn remove_prefix(&self, prefix: &str) -> Result<()>;
}
