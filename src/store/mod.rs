//! Object store gateway: the capability interface the orchestrators talk to,
//! plus the key layout helpers and the S3 implementation.

pub mod keys;
pub mod s3;

use crate::utils::errors::Result;
use async_trait::async_trait;
use std::path::Path;

/// Thin capability interface over the object store. The orchestrators only
/// ever go through this trait, so tests can substitute an in-memory store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream the file at `source` to `key`, overwriting any existing object.
    async fn put(&self, key: &str, source: &Path) -> Result<()>;

    /// Every key beginning with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete all given keys in one batch. Any reported failure means the
    /// outcome on individual keys is unspecified.
    async fn delete_batch(&self, doomed: &[String]) -> Result<()>;

    /// Download `key` into the file at `dest`, returning the byte count.
    async fn get(&self, key: &str, dest: &Path) -> Result<u64>;
}
