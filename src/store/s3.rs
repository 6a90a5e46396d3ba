//! S3 implementation of the object store gateway.

use super::ObjectStore;
use crate::utils::errors::{BackupError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    /// Build a client from the ambient AWS configuration (environment,
    /// shared config files, instance metadata).
    pub async fn connect(bucket: &str) -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = Client::new(&config);
        debug!(bucket, "S3 client initialized");
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

fn remote(err: impl std::fmt::Display) -> BackupError {
    BackupError::Remote(err.to_string())
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(&self, key: &str, source: &Path) -> Result<()> {
        let body = ByteStream::from_path(source).await.map_err(remote)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|err| remote(DisplayErrorContext(err)))?;
        debug!(key, "upload complete");
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let mut listing = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|err| remote(DisplayErrorContext(err)))?;
            for object in page.contents() {
                if let Some(key) = object.key() {
                    listing.push(key.to_string());
                }
            }
        }

        debug!(prefix, count = listing.len(), "listed objects");
        Ok(listing)
    }

    async fn delete_batch(&self, doomed: &[String]) -> Result<()> {
        let objects = doomed
            .iter()
            .map(|key| ObjectIdentifier::builder().key(key).build().map_err(remote))
            .collect::<Result<Vec<_>>>()?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .build()
            .map_err(remote)?;

        let output = self
            .client
            .delete_objects()
            .bucket(&self.bucket)
            .delete(delete)
            .send()
            .await
            .map_err(|err| remote(DisplayErrorContext(err)))?;

        let errors = output.errors();
        if !errors.is_empty() {
            let detail = errors
                .iter()
                .map(|err| {
                    format!(
                        "{}: {}",
                        err.key().unwrap_or("<unknown key>"),
                        err.message().unwrap_or("unknown error")
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BackupError::Remote(format!(
                "batch delete failed for {} object(s): {detail}",
                errors.len()
            )));
        }

        Ok(())
    }

    async fn get(&self, key: &str, dest: &Path) -> Result<u64> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| remote(DisplayErrorContext(err)))?;

        let mut body = output.body.into_async_read();
        let mut file = tokio::fs::File::create(dest).await?;
        let written = tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;

        debug!(key, bytes = written, "download complete");
        Ok(written)
    }
}
